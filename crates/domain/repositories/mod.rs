pub mod billing;
pub mod generations;
pub mod users;
