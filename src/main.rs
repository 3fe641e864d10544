use std::{net::Ipv4Addr, sync::Arc};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use taskflow::{auth::TokenIssuer, config, config::Config, create_app, db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Before the subscriber, so a RUST_LOG in .env takes effect.
    config::load_dotenv()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskflow=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().inspect_err(|err| error!(%err, "invalid configuration"))?;

    let db = db::init_db(&config.database_url)
        .inspect_err(|err| error!(%err, path = %config.database_url, "opening database"))?;
    info!(path = %config.database_url, "database ready");

    let state = AppState {
        db,
        tokens: Arc::new(TokenIssuer::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl,
        )),
        base_path: Arc::new(config.base_path),
    };
    let app = create_app(state);
    let addr = (Ipv4Addr::UNSPECIFIED, config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("running on {addr:?}");

    axum::serve(listener, app).await?;
    Ok(())
}
