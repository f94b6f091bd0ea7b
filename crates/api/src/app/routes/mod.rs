use axum::Router;

pub mod companies;
pub mod partners;
pub mod sequences;
pub mod system;
pub mod warehouses;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/companies", companies::router())
        .nest("/partners", partners::router())
        .nest("/warehouses", warehouses::router())
        .nest("/sequences", sequences::router())
}
