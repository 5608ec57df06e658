use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use mesa_engine::{
    db_types::{Establishment, OrderStatus, OwnerIdentity, Role},
    events::EventProducers,
    OrderBroker,
    OrderFlowApi,
};
use serde_json::json;

use super::{
    helpers::{get_auth_config, get_request, issue_token, order_fixture, post_request},
    mocks::MockMarketplaceBackend,
};
use crate::{
    auth::TokenVerifier,
    routes::{
        CreateOrderRoute,
        LiveOrdersRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        SubmitFeedbackRoute,
        UpdateOrderStatusRoute,
    },
};

fn establishment_fixture() -> Establishment {
    Establishment {
        id: "est-0000cafe".into(),
        name: "Cafe Fixture".into(),
        owner_identity: OwnerIdentity::new("owner@cafe.test"),
        description: None,
        created_at: chrono::Utc::now(),
    }
}

fn new_order_body() -> serde_json::Value {
    json!({
        "establishment_id": "est-0000cafe",
        "items": [{ "name": "flat white", "quantity": 2, "unit_price": 450 }],
    })
}

//----------------------------------------------   Creation  ----------------------------------------------------

#[actix_web::test]
async fn create_order_returns_the_stored_order() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let (status, body) =
        post_request(&token, "/orders", new_order_body(), configure_create).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains("a1b2c3d4e5f6"));
    assert!(body.contains(r#""status":"pending""#));
}

#[actix_web::test]
async fn create_order_for_unknown_establishment_is_a_404() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let body = json!({ "establishment_id": "est-nope", "items": [] });
    let (status, body) = post_request(&token, "/orders", body, configure_no_establishment).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"));
}

fn configure_create(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_establishment().returning(|_| Ok(Some(establishment_fixture())));
    backend.expect_insert_order().returning(|order, _| {
        assert_eq!(order.customer_id, "cust-1");
        Ok(order_fixture(OrderStatus::Pending))
    });
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(CreateOrderRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

fn configure_no_establishment(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_establishment().returning(|_| Ok(None));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(CreateOrderRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

//----------------------------------------------   Listing and fetching  ---------------------------------------------

#[actix_web::test]
async fn customers_list_their_own_orders() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let (status, body) = get_request(&token, "/orders", configure_listing).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("a1b2c3d4e5f6"));
}

#[actix_web::test]
async fn customers_fetch_their_own_order_by_id() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let (status, body) = get_request(&token, "/order/a1b2c3d4e5f6", configure_listing).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""customer_id":"cust-1""#));
}

#[actix_web::test]
async fn another_customers_order_is_forbidden_not_missing() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-2", Role::Customer);
    let (status, _) = get_request(&token, "/order/a1b2c3d4e5f6", configure_listing).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn partners_of_another_establishment_are_forbidden() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("partner-2", Role::Partner);
    let (status, _) =
        get_request(&token, "/order/a1b2c3d4e5f6", configure_other_partner).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn configure_listing(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_search_orders().returning(|_| Ok(vec![order_fixture(OrderStatus::Pending)]));
    backend.expect_fetch_order_by_order_id().returning(|_| Ok(Some(order_fixture(OrderStatus::Pending))));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(MyOrdersRoute::<MockMarketplaceBackend>::new())
        .service(OrderByIdRoute::<MockMarketplaceBackend>::new())
        .app_data(web::Data::new(api));
}

fn configure_other_partner(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_order_by_order_id().returning(|_| Ok(Some(order_fixture(OrderStatus::Pending))));
    backend
        .expect_fetch_owner_identity_for_partner()
        .returning(|_| Ok(Some(OwnerIdentity::new("someone@else.test"))));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(OrderByIdRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

//----------------------------------------------   Status updates  ---------------------------------------------------

#[actix_web::test]
async fn owning_partner_moves_an_order_forward() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("partner-1", Role::Partner);
    let body = json!({ "status": "processing" });
    let (status, body) =
        post_request(&token, "/order/a1b2c3d4e5f6/status", body, configure_status).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"processing""#));
}

#[actix_web::test]
async fn transitions_out_of_terminal_states_conflict() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("partner-1", Role::Partner);
    let body = json!({ "status": "cancelled" });
    let (status, body) = post_request(&token, "/order/a1b2c3d4e5f6/status", body, configure_status_served)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Illegal status transition"));
}

#[actix_web::test]
async fn pending_is_never_a_valid_target() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("partner-1", Role::Partner);
    let body = json!({ "status": "pending" });
    let (status, _) =
        post_request(&token, "/order/a1b2c3d4e5f6/status", body, configure_status).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

fn configure_status(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_order_by_order_id().returning(|_| Ok(Some(order_fixture(OrderStatus::Pending))));
    backend
        .expect_fetch_owner_identity_for_partner()
        .returning(|_| Ok(Some(OwnerIdentity::new("owner@cafe.test"))));
    backend.expect_update_order_status().returning(|_, _, next| Ok(Some(order_fixture(next))));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(UpdateOrderStatusRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

fn configure_status_served(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_order_by_order_id().returning(|_| Ok(Some(order_fixture(OrderStatus::Served))));
    backend
        .expect_fetch_owner_identity_for_partner()
        .returning(|_| Ok(Some(OwnerIdentity::new("owner@cafe.test"))));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(UpdateOrderStatusRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

//----------------------------------------------   Feedback  ---------------------------------------------------------

#[actix_web::test]
async fn customers_rate_served_orders() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let body = json!({ "rating": 4, "feedback": "great coffee" });
    let (status, body) =
        post_request(&token, "/order/a1b2c3d4e5f6/feedback", body, configure_feedback).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""rating":4"#));
}

#[actix_web::test]
async fn zero_ratings_are_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let body = json!({ "rating": 0 });
    let (status, body) =
        post_request(&token, "/order/a1b2c3d4e5f6/feedback", body, configure_feedback).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid rating"));
}

#[actix_web::test]
async fn rating_twice_conflicts() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let body = json!({ "rating": 5 });
    let (status, body) = post_request(&token, "/order/a1b2c3d4e5f6/feedback", body, configure_already_rated)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already been rated"));
}

#[actix_web::test]
async fn unserved_orders_cannot_be_rated() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("cust-1", Role::Customer);
    let body = json!({ "rating": 5 });
    let (status, _) =
        post_request(&token, "/order/a1b2c3d4e5f6/feedback", body, configure_feedback_pending).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

fn configure_feedback(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_order_by_order_id().returning(|_| Ok(Some(order_fixture(OrderStatus::Served))));
    backend.expect_apply_feedback().returning(|_, rating, feedback| {
        let mut order = order_fixture(OrderStatus::Served);
        order.rating = Some(rating);
        order.feedback = feedback;
        order.feedback_at = Some(chrono::Utc::now());
        Ok(Some(order))
    });
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(SubmitFeedbackRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

fn configure_already_rated(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_order_by_order_id().returning(|_| {
        let mut order = order_fixture(OrderStatus::Served);
        order.rating = Some(4);
        Ok(Some(order))
    });
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(SubmitFeedbackRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

fn configure_feedback_pending(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_order_by_order_id().returning(|_| Ok(Some(order_fixture(OrderStatus::Pending))));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(SubmitFeedbackRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

//----------------------------------------------   Live channel  -----------------------------------------------------

#[actix_web::test]
async fn live_channel_handshake_is_an_event_stream() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("partner-1", Role::Partner);
    let req = TestRequest::get()
        .uri("/orders/live")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let verifier = TokenVerifier::new(&get_auth_config());
    let app = App::new().app_data(web::Data::new(verifier)).configure(configure_live);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers().get("content-type").unwrap().to_str().unwrap();
    assert_eq!(content_type, "text/event-stream");
}

#[actix_web::test]
async fn live_channel_without_a_profile_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("partner-9", Role::Partner);
    let (status, _) = get_request(&token, "/orders/live", configure_live_no_profile).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn configure_live(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend
        .expect_fetch_owner_identity_for_partner()
        .returning(|_| Ok(Some(OwnerIdentity::new("owner@cafe.test"))));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(LiveOrdersRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}

fn configure_live_no_profile(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_fetch_owner_identity_for_partner().returning(|_| Ok(None));
    let api = OrderFlowApi::new(backend, OrderBroker::new(), EventProducers::default());
    cfg.service(LiveOrdersRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}
