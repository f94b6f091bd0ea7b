use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use depot_infra::provisioning::TenantContext;
use depot_stock::SequenceId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:id/next", post(next_number))
}

/// Reserve the next number of an operation type's sequence.
pub async fn next_number(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let sequence_id = match dto::parse_aggregate_id(&id, "sequence") {
        Ok(id) => SequenceId::new(id),
        Err(resp) => return resp,
    };
    match services.warehouses.reserve_number(ctx.tenant_id, sequence_id) {
        Ok(reserved) => (StatusCode::OK, Json(reserved)).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}
