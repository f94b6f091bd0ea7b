use depot_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    depot_observability::init();

    let config = ApiConfig::from_env();
    let app = depot_api::app::build_app();

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
