use serde::Serialize;

use crate::domain::value_objects::enums::subscription_tiers::SubscriptionTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub price_minor: i32,
    pub tier: SubscriptionTier,
}

impl SubscriptionPlan {
    pub fn credits(&self) -> i32 {
        self.tier.monthly_credits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditPackage {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i32,
    pub bonus: i32,
    pub price_minor: i32,
}

impl CreditPackage {
    pub fn total_credits(&self) -> i32 {
        self.credits + self.bonus
    }
}

pub const SUBSCRIPTION_PLANS: [SubscriptionPlan; 3] = [
    SubscriptionPlan {
        id: "free",
        name: "Free",
        price_minor: 0,
        tier: SubscriptionTier::Free,
    },
    SubscriptionPlan {
        id: "pro",
        name: "Pro",
        price_minor: 999,
        tier: SubscriptionTier::Pro,
    },
    SubscriptionPlan {
        id: "enterprise",
        name: "Enterprise",
        price_minor: 2999,
        tier: SubscriptionTier::Enterprise,
    },
];

pub const CREDIT_PACKAGES: [CreditPackage; 4] = [
    CreditPackage {
        id: "credits-10",
        name: "10 Credits",
        credits: 10,
        bonus: 0,
        price_minor: 499,
    },
    CreditPackage {
        id: "credits-25",
        name: "25 Credits",
        credits: 25,
        bonus: 5,
        price_minor: 999,
    },
    CreditPackage {
        id: "credits-50",
        name: "50 Credits",
        credits: 50,
        bonus: 15,
        price_minor: 1999,
    },
    CreditPackage {
        id: "credits-100",
        name: "100 Credits",
        credits: 100,
        bonus: 35,
        price_minor: 3499,
    },
];

/// Processor price ids, one per sellable offer. Unset entries cannot be checked out.
#[derive(Debug, Clone, Default)]
pub struct PriceIds {
    pub pro: Option<String>,
    pub enterprise: Option<String>,
    pub credits_10: Option<String>,
    pub credits_25: Option<String>,
    pub credits_50: Option<String>,
    pub credits_100: Option<String>,
}

/// Static plans and packages joined with the configured processor price ids.
#[derive(Debug, Clone, Default)]
pub struct BillingCatalog {
    prices: PriceIds,
}

impl BillingCatalog {
    pub fn new(prices: PriceIds) -> Self {
        Self { prices }
    }

    pub fn plan(&self, plan_id: &str) -> Option<&'static SubscriptionPlan> {
        SUBSCRIPTION_PLANS.iter().find(|plan| plan.id == plan_id)
    }

    pub fn package(&self, package_id: &str) -> Option<&'static CreditPackage> {
        CREDIT_PACKAGES.iter().find(|package| package.id == package_id)
    }

    pub fn plan_for_tier(&self, tier: SubscriptionTier) -> &'static SubscriptionPlan {
        SUBSCRIPTION_PLANS
            .iter()
            .find(|plan| plan.tier == tier)
            .unwrap_or(&SUBSCRIPTION_PLANS[0])
    }

    pub fn plan_price_id(&self, plan: &SubscriptionPlan) -> Option<&str> {
        match plan.tier {
            SubscriptionTier::Free => None,
            SubscriptionTier::Pro => self.prices.pro.as_deref(),
            SubscriptionTier::Enterprise => self.prices.enterprise.as_deref(),
        }
    }

    pub fn package_price_id(&self, package: &CreditPackage) -> Option<&str> {
        match package.id {
            "credits-10" => self.prices.credits_10.as_deref(),
            "credits-25" => self.prices.credits_25.as_deref(),
            "credits-50" => self.prices.credits_50.as_deref(),
            "credits-100" => self.prices.credits_100.as_deref(),
            _ => None,
        }
    }

    /// Maps a processor price id on a subscription item back to the plan it sells.
    pub fn plan_by_price_id(&self, price_id: &str) -> Option<&'static SubscriptionPlan> {
        SUBSCRIPTION_PLANS
            .iter()
            .find(|plan| self.plan_price_id(plan) == Some(price_id))
    }

    pub fn plan_offers(&self) -> Vec<PlanOfferDto> {
        SUBSCRIPTION_PLANS
            .iter()
            .map(|plan| PlanOfferDto {
                id: plan.id,
                name: plan.name,
                price_minor: plan.price_minor,
                credits: plan.credits(),
                tier: plan.tier,
                purchasable: self.plan_price_id(plan).is_some(),
            })
            .collect()
    }

    pub fn package_offers(&self) -> Vec<PackageOfferDto> {
        CREDIT_PACKAGES
            .iter()
            .map(|package| PackageOfferDto {
                id: package.id,
                name: package.name,
                credits: package.credits,
                bonus: package.bonus,
                price_minor: package.price_minor,
                purchasable: self.package_price_id(package).is_some(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOfferDto {
    pub id: &'static str,
    pub name: &'static str,
    pub price_minor: i32,
    pub credits: i32,
    pub tier: SubscriptionTier,
    pub purchasable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageOfferDto {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i32,
    pub bonus: i32,
    pub price_minor: i32,
    pub purchasable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> BillingCatalog {
        BillingCatalog::new(PriceIds {
            pro: Some("price_pro".to_string()),
            enterprise: Some("price_ent".to_string()),
            credits_10: Some("price_c10".to_string()),
            credits_25: Some("price_c25".to_string()),
            credits_50: None,
            credits_100: Some("price_c100".to_string()),
        })
    }

    #[test]
    fn resolves_plan_from_price_id() {
        let catalog = catalog();
        let plan = catalog.plan_by_price_id("price_ent").expect("plan");
        assert_eq!(plan.tier, SubscriptionTier::Enterprise);
        assert_eq!(plan.credits(), 500);
        assert!(catalog.plan_by_price_id("price_unknown").is_none());
    }

    #[test]
    fn free_plan_has_no_price() {
        let catalog = catalog();
        let free = catalog.plan("free").expect("free plan");
        assert!(catalog.plan_price_id(free).is_none());
    }

    #[test]
    fn package_totals_include_bonus() {
        let catalog = catalog();
        assert_eq!(catalog.package("credits-10").unwrap().total_credits(), 10);
        assert_eq!(catalog.package("credits-25").unwrap().total_credits(), 30);
        assert_eq!(catalog.package("credits-50").unwrap().total_credits(), 65);
        assert_eq!(catalog.package("credits-100").unwrap().total_credits(), 135);
    }

    #[test]
    fn unconfigured_package_is_not_purchasable() {
        let offers = catalog().package_offers();
        let fifty = offers.iter().find(|offer| offer.id == "credits-50").unwrap();
        assert!(!fifty.purchasable);
        assert!(offers.iter().filter(|offer| offer.id != "credits-50").all(|o| o.purchasable));
    }
}
