use axum::{http::StatusCode, middleware::Next, response::Response};

use crate::app::errors;
use crate::context;

/// Attach the header-derived `TenantContext` to the request, or reject it.
pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ctx = match context::from_headers(req.headers()) {
        Ok(ctx) => ctx,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_context", e.message());
        }
    };

    req.extensions_mut().insert(ctx);
    next.run(req).await
}
