//! Exits 0 once the database at `DATABASE_URL` answers; retries every second until then.

use anyhow::Context;
use recipe_api::{
    logging::init_tracing,
    readiness::{wait_for_db, PgCheck, CHECK_INTERVAL},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    wait_for_db(&PgCheck::new(url), CHECK_INTERVAL).await?;
    Ok(())
}
