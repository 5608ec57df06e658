use std::collections::HashMap;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use mesa_engine::{db_types::RatingSummary, RatingApi};

use super::{helpers::get_request, mocks::MockMarketplaceBackend};
use crate::routes::RatingsRoute;

#[actix_web::test]
async fn ratings_are_public_and_fill_in_missing_establishments() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/ratings?ids=est-a,est-b", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""average":4.0"#) || body.contains(r#""average":4"#));
    assert!(body.contains(r#""count":3"#));
    // est-b has no qualifying orders and still shows up
    assert!(body.contains("est-b"));
    assert!(body.contains(r#""count":0"#));
}

#[actix_web::test]
async fn an_empty_id_list_yields_an_empty_map() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/ratings?ids=", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{}");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockMarketplaceBackend::new();
    backend.expect_aggregate_ratings().returning(|ids| {
        let mut result = HashMap::new();
        if ids.contains(&"est-a".to_string()) {
            result.insert("est-a".to_string(), RatingSummary { average: 4.0, count: 3 });
        }
        Ok(result)
    });
    let api = RatingApi::new(backend);
    cfg.service(RatingsRoute::<MockMarketplaceBackend>::new()).app_data(web::Data::new(api));
}
