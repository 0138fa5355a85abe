pub mod domain;
pub mod generation;
pub mod identity;
pub mod infra;
pub mod observability;
pub mod payments;
