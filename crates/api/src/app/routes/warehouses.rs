use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use depot_infra::provisioning::TenantContext;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_warehouse).get(search_warehouses))
        .route("/defaults", get(default_values))
        .route("/onchange/company", post(onchange_company))
        .route("/:id", get(get_warehouse).patch(update_warehouse))
        .route("/:id/locations", get(list_locations))
        .route("/:id/routes", get(list_routes))
        .route("/:id/operation-types", get(list_operation_types))
}

/// Provision a warehouse; advisories ride along with the created record.
pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Json(body): Json<dto::CreateWarehouseRequest>,
) -> axum::response::Response {
    let input = match body.into_input() {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    match services.warehouses.create_warehouse(&ctx, input) {
        Ok(provisioned) => {
            for advisory in &provisioned.advisories {
                tracing::info!(tenant_id = %ctx.tenant_id, message = %advisory.message, "advisory emitted");
            }
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "warehouse": dto::warehouse_to_json(provisioned.warehouse),
                    "advisories": provisioned.advisories,
                })),
            )
                .into_response()
        }
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateWarehouseRequest>,
) -> axum::response::Response {
    let warehouse_id = match dto::parse_warehouse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let changes = match body.into_changes() {
        Ok(changes) => changes,
        Err(resp) => return resp,
    };

    match services
        .warehouses
        .write_warehouse(ctx.tenant_id, warehouse_id, changes)
    {
        Ok(rm) => (StatusCode::OK, Json(dto::warehouse_to_json(rm))).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id = match dto::parse_warehouse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.warehouses.get_warehouse(ctx.tenant_id, warehouse_id) {
        Ok(rm) => (StatusCode::OK, Json(dto::warehouse_to_json(rm))).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

/// Sorted by sequence, then creation order.
pub async fn search_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Query(query): Query<dto::SearchWarehousesQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(resp) => return resp,
    };
    let items = services
        .warehouses
        .search_warehouses(ctx.tenant_id, &filter)
        .into_iter()
        .map(dto::warehouse_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn default_values(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
) -> axum::response::Response {
    let defaults = services.warehouses.default_warehouse_values(&ctx);
    (StatusCode::OK, Json(defaults)).into_response()
}

pub async fn onchange_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
) -> axum::response::Response {
    match services.warehouses.onchange_company(ctx.tenant_id) {
        Ok(warning) => (StatusCode::OK, Json(serde_json::json!({ "warning": warning }))).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id = match dto::parse_warehouse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.warehouses.warehouse_locations(ctx.tenant_id, warehouse_id) {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

pub async fn list_routes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id = match dto::parse_warehouse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.warehouses.warehouse_routes(ctx.tenant_id, warehouse_id) {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

pub async fn list_operation_types(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id = match dto::parse_warehouse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services
        .warehouses
        .warehouse_operation_types(ctx.tenant_id, warehouse_id)
    {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}
