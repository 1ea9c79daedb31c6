//! Config-driven server: reads shapes and endpoints from a JSON descriptor file (`SHAPES_PATH`,
//! default `demos/shapes.json`), creates the backing tables and mounts common and CRUD routes.

use shape_crud::{
    common_routes, create_tables, crud_routes, load_shapes_from_path, resolve, AppState, Controller,
    ControllerConfig, PgStorage, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("shape_crud=info".parse()?))
        .init();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    let path = settings
        .shapes_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("demos/shapes.json"));
    let model = resolve(&load_shapes_from_path(&path).await?)?;
    create_tables(&pool, model.base_shapes(), &settings.table_prefix).await?;

    let storage = Arc::new(PgStorage::new(pool, settings.table_prefix.clone()));
    let mut controller = Controller::new(storage, ControllerConfig::default().tag_name(settings.tag_name.clone()));
    model.register(&mut controller)?;

    let state = AppState::new(controller).with_body_limit(settings.body_limit);
    let app = common_routes().merge(crud_routes(state));

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
