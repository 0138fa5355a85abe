use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use crates::domain::value_objects::{catalog::BillingCatalog, image_models::IMAGE_MODELS};
use serde_json::json;
use std::sync::Arc;

pub fn routes(catalog: BillingCatalog) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .route("/plans", get(list_plans))
        .with_state(Arc::new(catalog))
}

pub async fn list_models() -> impl IntoResponse {
    Json(json!({ "models": IMAGE_MODELS }))
}

pub async fn list_plans(State(catalog): State<Arc<BillingCatalog>>) -> impl IntoResponse {
    Json(json!({
        "plans": catalog.plan_offers(),
        "credit_packages": catalog.package_offers(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use crates::domain::value_objects::catalog::PriceIds;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn plans_flag_offers_without_prices() {
        let catalog = BillingCatalog::new(PriceIds {
            pro: Some("price_pro".to_string()),
            ..Default::default()
        });

        let response = routes(catalog)
            .oneshot(Request::get("/plans").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let plans = body["plans"].as_array().unwrap();
        let pro = plans.iter().find(|plan| plan["id"] == "pro").unwrap();
        let enterprise = plans.iter().find(|plan| plan["id"] == "enterprise").unwrap();
        assert_eq!(pro["purchasable"], true);
        assert_eq!(enterprise["purchasable"], false);
        assert_eq!(body["credit_packages"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn models_list_the_catalog() {
        let response = routes(BillingCatalog::default())
            .oneshot(Request::get("/models").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["models"].as_array().unwrap().len(), IMAGE_MODELS.len());
    }
}
