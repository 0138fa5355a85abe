pub mod fal_client;
