use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use depot_infra::command_dispatcher::DispatchError;
use depot_infra::provisioning::ProvisioningError;

pub fn provisioning_error_to_response(err: ProvisioningError) -> axum::response::Response {
    match err {
        ProvisioningError::Constraint(msg) => json_error(StatusCode::CONFLICT, "constraint", msg),
        ProvisioningError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        e @ ProvisioningError::NotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        ProvisioningError::Dispatch(e) => dispatch_error_to_response(e),
        ProvisioningError::Projection(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "projection_error", e.to_string())
        }
        ProvisioningError::LockPoisoned => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "service unavailable",
        ),
    }
}

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
        DispatchError::TenantIsolation(msg) => json_error(StatusCode::FORBIDDEN, "tenant_isolation", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
