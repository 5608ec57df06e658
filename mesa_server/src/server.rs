use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use mesa_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderBroker,
    OrderFlowApi,
    RatingApi,
    SqliteDatabase,
};

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    mailer,
    routes::{
        health,
        CreateOrderRoute,
        IncomingOrdersRoute,
        LiveOrdersRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        RatingsRoute,
        SubmitFeedbackRoute,
        UpdateOrderStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let broker = OrderBroker::new();
    let mut hooks = EventHooks::default();
    if config.send_order_confirmations {
        info!("✉️ Order confirmation mail hook enabled");
        mailer::attach_order_confirmation_hook(&mut hooks);
    }
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, broker, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    broker: OrderBroker,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), broker.clone(), producers.clone());
        let ratings_api = RatingApi::new(db.clone());
        let verifier = TokenVerifier::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mesa::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(ratings_api))
            .app_data(web::Data::new(verifier));
        // Routes under /api carry the ACL middleware; everything else is public.
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(IncomingOrdersRoute::<SqliteDatabase>::new())
            .service(LiveOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(SubmitFeedbackRoute::<SqliteDatabase>::new());
        app.service(health).service(RatingsRoute::<SqliteDatabase>::new()).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
