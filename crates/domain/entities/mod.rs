pub mod credit_purchases;
pub mod generations;
pub mod users;
