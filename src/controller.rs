use std::net::SocketAddr;

use actix_web::{HttpRequest, HttpResponse};

use serde::Serialize;

use crate::error::{RestError, RestResult};

pub mod analytics;
pub mod auth;
pub mod blogs;
pub mod catalog;
pub mod content;
pub mod coupons;
pub mod cron;
pub mod inquiries;
pub mod newsletters;
pub mod orders;
pub mod subscribers;
pub mod tracking;

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// `200 {"success": true, "data": ...}`
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        success: true,
        data,
    })
}

/// `201 {"success": true, "data": ...}`
pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        success: true,
        data,
    })
}

/// `200 {"success": true, "message": ...}`
pub fn done(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": message,
    }))
}

/// Map a "rows affected" flag from a delete into a response
pub fn deleted(removed: bool, entity: &str) -> RestResult<HttpResponse> {
    if removed {
        Ok(done(&format!("{} deleted", entity)))
    } else {
        Err(RestError::not_found(entity))
    }
}

/// Require a non-blank string field
pub fn required(value: &str, field: &str) -> RestResult<()> {
    if value.trim().is_empty() {
        Err(RestError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// Client IP as seen through proxies, without the port
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    let info = req.connection_info();
    let addr = info.realip_remote_addr()?;
    let ip = match addr.parse::<SocketAddr>() {
        Ok(socket) => socket.ip().to_string(),
        Err(_) => addr.to_string(),
    };
    Some(ip)
}
