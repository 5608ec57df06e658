//! Access control middleware for the Mesa server.
//! This middleware can be placed on any route or service.
//!
//! It extracts the bearer token from the `Authorization` header, verifies it against the shared
//! [`TokenVerifier`], and checks the role claim against the roles required by the route. On success the verified
//! claims are inserted into the request extensions for handlers to extract; otherwise the request is rejected
//! with 401 (missing or invalid token) or 403 (wrong role).

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorInternalServerError,
    web,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use mesa_engine::db_types::Role;

use crate::{
    auth::{bearer_token, TokenVerifier},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    /// An empty role list means any authenticated caller is allowed through.
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let verifier = req.app_data::<web::Data<TokenVerifier>>().ok_or_else(|| {
                log::warn!("No token verifier found in app data");
                ErrorInternalServerError("No token verifier found in app data")
            })?;
            let claims = bearer_token(req.request())
                .and_then(|token| verifier.verify(token))
                .map_err(ServerError::AuthenticationError)?;
            if required_roles.is_empty() || required_roles.contains(&claims.role) {
                req.extensions_mut().insert(claims);
                service.call(req).await
            } else {
                log::debug!("🔐️ Role {} may not access {}", claims.role, req.path());
                Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(format!(
                    "Role {} may not access this resource",
                    claims.role
                )))
                .into())
            }
        })
    }
}
