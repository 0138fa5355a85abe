use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// What a checkout session is buying. Travels through the processor as the `type`
/// metadata key and comes back on `checkout.session.completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    Subscription,
    Credits,
}

impl Display for PurchaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            PurchaseType::Subscription => "subscription",
            PurchaseType::Credits => "credits",
        };
        write!(f, "{}", value)
    }
}

impl PurchaseType {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "subscription" => Some(PurchaseType::Subscription),
            "credits" => Some(PurchaseType::Credits),
            _ => None,
        }
    }

    /// Checkout session mode for this purchase.
    pub fn checkout_mode(&self) -> &'static str {
        match self {
            PurchaseType::Subscription => "subscription",
            PurchaseType::Credits => "payment",
        }
    }
}
