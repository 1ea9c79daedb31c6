//! Sample service: a User record behind `/users/` and a password-only `/users/password/`.
//!
//! Run from repo root: `cargo run -p sample-user`

mod password;
mod user;

use shape_crud::{
    common_routes, create_table, crud_routes, AppState, Controller, ControllerConfig, EndpointOptions,
    Operation, PgStorage, Settings, StaticShape,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shape_crud=info,sample_user=info")),
        )
        .init();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    let base = user::user()?;
    create_table(&pool, &base, &settings.table_prefix).await?;

    let storage = Arc::new(PgStorage::new(pool, settings.table_prefix.clone()));
    let mut controller = Controller::new(
        storage,
        ControllerConfig::default()
            .tag_name(settings.tag_name.clone())
            .password_transform(password::hash_password),
    );

    let base = StaticShape::new(base).shared();
    controller.add_endpoint(
        "/users/",
        Arc::clone(&base),
        EndpointOptions::new()
            .create(StaticShape::new(user::user_create()?).shared())
            .read(StaticShape::new(user::user_list()?).shared())
            .update(StaticShape::new(user::user_update()?).shared())
            .list(StaticShape::new(user::user_list()?).shared()),
    )?;
    controller.add_endpoint(
        "/users/password/",
        base,
        EndpointOptions::new()
            .update(StaticShape::new(user::user_update_password()?).shared())
            .operations(Operation::Update),
    )?;

    let state = AppState::new(controller).with_body_limit(settings.body_limit);
    let app = common_routes().merge(crud_routes(state));

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("sample-user listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
