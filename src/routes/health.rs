use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use lazy_static::lazy_static;
use serde_json::json;
use std::time::Instant;

lazy_static! {
    // Anchored on first touch, which happens when the route table is built.
    static ref STARTED_AT: Instant = Instant::now();
}

/// Liveness probe. Lives outside the authenticated scope.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": Utc::now(),
        "uptime": STARTED_AT.elapsed().as_secs()
    }))
}
