//! Bearer token middleware.
//!
//! Every request through the wrapped service must carry a valid `Authorization: Bearer <jwt>` header. The verified
//! claims are stored in the request extensions, where handlers (via the [`JwtClaims`] extractor) and the ACL
//! middleware pick them up. Requests without a valid token are answered with 401 Unauthorized.
use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{JwtClaims, TokenVerifier},
    errors::ServerError,
};

pub struct JwtAuthMiddlewareFactory {
    verifier: Rc<TokenVerifier>,
}

impl JwtAuthMiddlewareFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier: Rc::new(verifier) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtAuthMiddlewareService { verifier: Rc::clone(&self.verifier), service: Rc::new(service) })
    }
}

pub struct JwtAuthMiddlewareService<S> {
    verifier: Rc<TokenVerifier>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
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
        let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(String::from);
        let result = self.verifier.verify_bearer(header.as_deref());
        Box::pin(async move {
            let claims: JwtClaims = result.map_err(|e| {
                debug!("🔐️ Rejected request to {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
