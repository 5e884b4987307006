use actix_web::HttpRequest;
use slotbook_domain::{Host, ID};
use slotbook_infra::SlotbookContext;

use crate::error::SlotbookError;

/// Header carrying the authenticated host identity.
///
/// Session issuance and validation happen outside this service; the gateway
/// in front of it resolves the session and forwards the host id here.
pub const HOST_ID_HEADER: &str = "x-slotbook-host-id";

/// Resolve the calling host on a host-only route, or reject with 401.
pub async fn protect_host_route(
    http_req: &HttpRequest,
    ctx: &SlotbookContext,
) -> Result<Host, SlotbookError> {
    let host_id = http_req
        .headers()
        .get(HOST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            SlotbookError::Unauthorized(format!("Missing required `{}` header", HOST_ID_HEADER))
        })?;

    let host_id = host_id.parse::<ID>().map_err(|_| {
        SlotbookError::Unauthorized(format!("Malformed `{}` header", HOST_ID_HEADER))
    })?;

    ctx.repos
        .hosts
        .find(&host_id)
        .await
        .map_err(|_| SlotbookError::InternalError)?
        .ok_or_else(|| SlotbookError::Unauthorized("Unknown host identity".to_string()))
}

/// The calling host when the request carries a valid identity, `None` for an
/// anonymous caller. Used by routes that accept both hosts and guests.
pub async fn maybe_host(
    http_req: &HttpRequest,
    ctx: &SlotbookContext,
) -> Result<Option<Host>, SlotbookError> {
    if http_req.headers().get(HOST_ID_HEADER).is_none() {
        return Ok(None);
    }
    protect_host_route(http_req, ctx).await.map(Some)
}
