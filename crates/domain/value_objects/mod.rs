pub mod billing;
pub mod catalog;
pub mod enums;
pub mod generations;
pub mod image_models;
pub mod users;
