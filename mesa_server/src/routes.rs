//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions. Async handlers get executed
//! concurrently by worker threads and thus don't block execution. The SSE handler relies on this: it parks on the
//! broker receiver for the life of the connection.

use actix_web::{
    get,
    http::header::{CacheControl, CacheDirective},
    web,
    HttpResponse,
    Responder,
};
use log::*;
use mesa_engine::{
    db_types::{OrderId, Role},
    traits::{OrderBackend, OrderManagement},
    OrderFlowApi,
    RatingApi,
};

use crate::{
    auth::JwtClaims,
    data_objects::{FeedbackRequest, NewOrderRequest, RatingsQuery, StatusUpdateRequest},
    errors::ServerError,
    live::LiveEventStream,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $bound:ty) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $bound + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $bound:ty where requires [$($roles:ty),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $bound + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/orders" impl OrderBackend where requires [Role::Customer]);
/// Route handler for the order creation endpoint
///
/// Customers place orders here. The customer id comes from the access token; the body only names the target
/// establishment, the line items and an optional contact address. A successful creation returns 201 together with
/// the stored order, whether or not the owning partner had a live channel open at the time.
pub async fn create_order<B: OrderBackend>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order for customer {}", claims.sub);
    let new_order = body.into_inner().into_new_order(&claims.sub);
    let order = api.create_order(new_order).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderBackend where requires [Role::Customer]);
/// Route handler for the customer order-history endpoint
///
/// Authenticated customers fetch their own orders here. The customer id is extracted from the access token, so
/// there is no way to enumerate anyone else's history.
pub async fn my_orders<B: OrderBackend>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let orders = api.my_orders(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(incoming_orders => Get "/orders/incoming" impl OrderBackend where requires [Role::Partner]);
/// Route handler for the partner order-queue endpoint
///
/// Partners fetch every order addressed to their establishments here: the partner's profile email is resolved
/// from their subject id and used as the ownership key. Partners without a profile get 403.
pub async fn incoming_orders<B: OrderBackend>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET incoming_orders for {}", claims.sub);
    let orders = api.orders_for_partner(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/order/{order_id}" impl OrderBackend where requires [Role::Customer, Role::Partner]);
/// Use `/order/{order_id}` to fetch a specific order by its order id.
///
/// Both roles may call this; the ownership predicate applied depends on the caller's role. Customers only see
/// orders they placed, partners only orders addressed to one of their establishments. Orders that exist but
/// belong to someone else return 403, never 404.
pub async fn order_by_id<B: OrderBackend>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order [{order_id}] for {} ({})", claims.sub, claims.role);
    let order = api.fetch_order_for(&claims.sub, claims.role, &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Post "/order/{order_id}/status" impl OrderBackend where requires [Role::Partner]);
/// Route handler for status transitions.
///
/// The owning partner moves an order through its lifecycle here. Illegal transitions (including any move out of
/// a terminal state, and `pending` as a target) return 409. The write is a compare-and-swap, so of two racing
/// updates exactly one succeeds.
pub async fn update_order_status<B: OrderBackend>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST status {} for order [{order_id}] by {}", body.status, claims.sub);
    let order = api.update_status(&claims.sub, &order_id, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(submit_feedback => Post "/order/{order_id}/feedback" impl OrderBackend where requires [Role::Customer]);
/// Route handler for rating a served order.
///
/// Only the customer who placed the order may rate it, only while it is `served`, and only once. Ratings above 5
/// are clamped; ratings below 1 are rejected with 400. Over-long feedback is truncated, not rejected.
pub async fn submit_feedback<B: OrderBackend>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<FeedbackRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST feedback for order [{order_id}] by {}", claims.sub);
    let body = body.into_inner();
    let order = api.submit_feedback(&claims.sub, &order_id, body.rating, body.feedback).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Live channel  ----------------------------------------------------

route!(live_orders => Get "/orders/live" impl OrderBackend where requires [Role::Partner]);
/// Route handler for the partner live channel.
///
/// Registers a sink with the broker under the partner's owner identity and streams events as SSE frames. The
/// first frame is always the `connected` acknowledgment, followed by a `new_order` frame for every order placed
/// against the partner's establishments while the connection is open. Closing the connection drops the stream,
/// which unsubscribes the sink synchronously.
pub async fn live_orders<B: OrderBackend>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET live channel for {}", claims.sub);
    let (subscription, receiver) = api.open_live_channel(&claims.sub).await?;
    let stream = LiveEventStream::new(subscription, receiver);
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(CacheControl(vec![CacheDirective::NoCache]))
        .streaming(stream))
}

//----------------------------------------------   Ratings  ----------------------------------------------------

route!(ratings => Get "/ratings" impl OrderManagement);
/// Route handler for the public ratings endpoint
///
/// Unauthenticated. Takes a comma-separated list of establishment ids and returns a `{average, count}` summary
/// for each of them; establishments with no qualifying orders report `{0.0, 0}`.
pub async fn ratings<B: OrderManagement>(
    query: web::Query<RatingsQuery>,
    api: web::Data<RatingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ids = query.establishment_ids();
    debug!("💻️ GET ratings for {} establishment(s)", ids.len());
    let summaries = api.public_ratings(&ids).await?;
    Ok(HttpResponse::Ok().json(summaries))
}
