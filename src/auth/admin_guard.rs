use std::future::{ready, Ready};

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpMessage, HttpResponse, ResponseError};

use futures_util::future::LocalBoxFuture;

use super::session_from_request;

const PAGE_PREFIX: &str = "/admin";
const API_PREFIX: &str = "/api/admin";
const LOGIN_PAGE: &str = "/login";

fn has_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Middleware rejecting unauthenticated requests to admin pages and admin APIs.
///
/// Pages are redirected to the login page, APIs get a 401 JSON body.
pub struct AdminGuard;

impl<S, B> Transform<S, ServiceRequest> for AdminGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminGuardMiddleware { service }))
    }
}

pub struct AdminGuardMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AdminGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path();
        let is_api = has_prefix(path, API_PREFIX);
        if !is_api && !has_prefix(path, PAGE_PREFIX) {
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        }

        match session_from_request(req.request()) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
            }
            Err(e) => {
                let response = if is_api {
                    e.error_response()
                } else {
                    HttpResponse::SeeOther()
                        .insert_header((header::LOCATION, LOGIN_PAGE))
                        .finish()
                };
                Box::pin(ready(Ok(req.into_response(response).map_into_right_body())))
            }
        }
    }
}
