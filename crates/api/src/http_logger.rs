use actix_web::{
    Error,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use tracing::{Level, Span};
use tracing_actix_web::{DefaultRootSpanBuilder, RootSpanBuilder};

/// Probes and scrapers hit these constantly; keep them out of the request log
const QUIET_PATHS: [&str; 2] = ["/api/v1/healthz", "/api/v1/metrics"];

/// Root span builder (tracing) for Actix Web
pub struct SlotbookTracingRootSpanBuilder;

impl RootSpanBuilder for SlotbookTracingRootSpanBuilder {
    fn on_request_start(request: &ServiceRequest) -> Span {
        let level = if QUIET_PATHS.contains(&request.path()) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        tracing_actix_web::root_span!(level = level, request)
    }

    fn on_request_end<B: MessageBody>(span: Span, outcome: &Result<ServiceResponse<B>, Error>) {
        match outcome {
            Ok(response) if !QUIET_PATHS.contains(&response.request().path()) => {
                log_response(response);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "Request failed before a response was produced");
            }
        }

        DefaultRootSpanBuilder::on_request_end(span, outcome);
    }
}

/// One line per finished request.
///
/// Slot contention (409) and rate limiting (429) are routine outcomes of
/// concurrent booking traffic; logging them as warnings would drown the
/// signal, so only the remaining client errors warn.
fn log_response<B: MessageBody>(response: &ServiceResponse<B>) {
    let status = response.status();
    let method = response.request().method();
    let path = response.request().path();

    let routine_contention =
        status == StatusCode::CONFLICT || status == StatusCode::TOO_MANY_REQUESTS;

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), "{} {} => {}", method, path, status);
    } else if status.is_client_error() && !routine_contention {
        tracing::warn!(status = status.as_u16(), "{} {} => {}", method, path, status);
    } else {
        tracing::info!(status = status.as_u16(), "{} {} => {}", method, path, status);
    }
}
