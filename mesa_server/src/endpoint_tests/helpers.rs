use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{Duration, TimeZone, Utc};
use log::debug;
use mesa_common::{Money, Secret};
use mesa_engine::db_types::{LineItem, Order, OrderId, OrderStatus, OwnerIdentity, Role};

use crate::{
    auth::{JwtClaims, TokenIssuer, TokenVerifier},
    config::AuthConfig,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("endpoint-test-secret-b0a4c7".to_string()) }
}

pub fn issue_token(sub: &str, role: Role) -> String {
    let claims = JwtClaims::new(sub, role, Duration::days(1));
    TokenIssuer::new(&get_auth_config()).issue_token(&claims).expect("Failed to sign token")
}

async fn send_request(
    mut req: TestRequest,
    auth_header: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    if !auth_header.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {auth_header}")));
    }
    let req = req.to_request();
    let verifier = TokenVerifier::new(&get_auth_config());
    let app = App::new().app_data(web::Data::new(verifier)).configure(configure);

    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn get_request(
    auth_header: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    send_request(TestRequest::get().uri(path), auth_header, configure).await
}

pub async fn post_request(
    auth_header: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    send_request(TestRequest::post().uri(path).set_json(body), auth_header, configure).await
}

// Shared order fixture. Owned by customer `cust-1` and owner identity `owner@cafe.test`.
pub fn order_fixture(status: OrderStatus) -> Order {
    Order {
        id: 1,
        order_id: OrderId("a1b2c3d4e5f6".into()),
        establishment_id: "est-0000cafe".into(),
        owner_identity: OwnerIdentity::new("owner@cafe.test"),
        customer_id: "cust-1".into(),
        items: vec![LineItem::new("flat white", 2, Money::from(450))],
        contact: None,
        status,
        rating: None,
        feedback: None,
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        feedback_at: None,
    }
}
