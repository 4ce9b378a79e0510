use recipe_api::{
    app::{build_app, serve},
    config::AppConfig,
    logging::init_tracing,
    readiness::{wait_for_db, PgCheck, CHECK_INTERVAL},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    wait_for_db(&PgCheck::new(config.database_url.clone()), CHECK_INTERVAL).await?;

    let (host, port) = (config.host.clone(), config.port);
    let state = AppState::init(config).await?;

    serve(build_app(state), &host, port).await
}
