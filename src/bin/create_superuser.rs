//! Creates a staff + superuser account: `create-superuser <email> <password>`.

use anyhow::{bail, Context};
use recipe_api::{auth::services::create_superuser, db::PgStore, logging::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        bail!("usage: create-superuser <email> <password>");
    };

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let store = PgStore::connect(&url).await?;
    store.migrate().await?;

    let user = create_superuser(&store, &email, &password)
        .await
        .context("create superuser")?;
    println!("superuser {} created (id {})", user.email, user.id);
    Ok(())
}
