use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use depot_infra::provisioning::{NewCompany, TenantContext};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_company).get(list_companies))
        .route("/:id", get(get_company))
}

/// Register a company together with its address partner.
pub async fn register_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Json(body): Json<dto::RegisterCompanyRequest>,
) -> axum::response::Response {
    let input = NewCompany {
        name: body.name,
        contact: body.contact.unwrap_or_default(),
    };
    match services.warehouses.register_company(ctx.tenant_id, input) {
        Ok(company) => (StatusCode::CREATED, Json(company)).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

pub async fn list_companies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
) -> axum::response::Response {
    let items = services.warehouses.companies(ctx.tenant_id);
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let company_id = match dto::parse_company_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.warehouses.company(ctx.tenant_id, company_id) {
        Ok(company) => (StatusCode::OK, Json(company)).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}
