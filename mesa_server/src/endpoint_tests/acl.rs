//! Tests for the bearer-token ACL middleware: token extraction, verification and role checks.

use actix_web::{web, web::ServiceConfig};
use mesa_engine::{
    db_types::{OrderStatus, Role},
    events::EventProducers,
    OrderBroker,
    OrderFlowApi,
};

use super::{
    helpers::{get_request, issue_token, order_fixture},
    mocks::MockMarketplaceBackend,
};
use crate::routes::{IncomingOrdersRoute, MyOrdersRoute};

#[actix_web::test]
async fn requests_without_a_token_are_rejected() {
    let _ = env_logger::try_init().ok();
    let err = get_request("", "/orders", configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. No access token was provided.");
}

#[actix_web::test]
async fn garbage_tokens_are_rejected() {
    let _ = env_logger::try_init().ok();
    let err = get_request("not.a.jwt", "/orders", configure).await.expect_err("Expected error");
    assert!(err.starts_with("Authentication Error. Access token is invalid."));
}

#[actix_web::test]
async fn tampered_tokens_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut token = issue_token("cust-1", Role::Customer);
    let n = token.len();
    token.replace_range(n - 10..n - 5, "00000");
    let err = get_request(&token, "/orders", configure).await.expect_err("Expected error");
    assert!(err.starts_with("Authentication Error. Access token is invalid."));
}

#[actix_web::test]
async fn customers_may_not_use_partner_routes() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let err = get_request(&token, "/orders/incoming", configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. Insufficient Permissions. Role customer may not access this resource");
}

#[actix_web::test]
async fn partners_may_not_use_customer_routes() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("partner-1", Role::Partner);
    let err = get_request(&token, "/orders", configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. Insufficient Permissions. Role partner may not access this resource");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_search_orders().returning(|_| Ok(vec![order_fixture(OrderStatus::Pending)]));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(MyOrdersRoute::<MockMarketplaceBackend>::new())
        .service(IncomingOrdersRoute::<MockMarketplaceBackend>::new())
        .app_data(web::Data::new(api));
}
