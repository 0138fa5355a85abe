pub mod billing;
pub mod generations;
pub mod identity_webhook;
pub mod user_resolver;
pub mod users;
