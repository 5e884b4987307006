use actix_web::{HttpResponse, web};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use slotbook_infra::metrics::INFRA_REGISTRY;

use crate::error::SlotbookError;

async fn status() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Ok",
    }))
}

async fn metrics() -> Result<HttpResponse, SlotbookError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&INFRA_REGISTRY.gather(), &mut buffer)
        .map_err(|_| SlotbookError::InternalError)?;

    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(status))
        .route("/metrics", web::get().to(metrics));
}
