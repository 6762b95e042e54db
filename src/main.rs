use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use recipe_box::{routes, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let address: std::net::SocketAddr = config.server_address().parse()?;
    log::info!("recipe-box listening on {address}");

    warp::serve(routes(pool)).run(address).await;

    Ok(())
}
