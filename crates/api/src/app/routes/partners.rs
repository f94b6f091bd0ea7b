use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use depot_infra::provisioning::{NewPartner, TenantContext};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_partner).get(list_partners))
        .route("/:id", get(get_partner))
}

pub async fn register_partner(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Json(body): Json<dto::RegisterPartnerRequest>,
) -> axum::response::Response {
    let company_id = match body.company_id.as_deref().map(dto::parse_company_id).transpose() {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let input = NewPartner {
        name: body.name,
        contact: body.contact.unwrap_or_default(),
        company_id,
    };
    match services.warehouses.register_partner(ctx.tenant_id, input) {
        Ok(partner) => (StatusCode::CREATED, Json(partner)).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

/// `?q=` filters on name, case-insensitively.
pub async fn list_partners(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<dto::SearchPartnersQuery>,
) -> axum::response::Response {
    let items = services.warehouses.partners(ctx.tenant_id, query.q.as_deref());
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_partner(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let partner_id = match dto::parse_partner_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.warehouses.partner(ctx.tenant_id, partner_id) {
        Ok(partner) => (StatusCode::OK, Json(partner)).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}
