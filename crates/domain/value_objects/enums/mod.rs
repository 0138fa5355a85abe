pub mod image_sizes;
pub mod purchase_types;
pub mod subscription_statuses;
pub mod subscription_tiers;
