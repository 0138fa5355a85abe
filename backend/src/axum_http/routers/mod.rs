pub mod billing;
pub mod catalog;
pub mod generations;
pub mod identity_webhook;
pub mod users;
