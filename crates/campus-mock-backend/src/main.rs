use std::net::SocketAddr;

use tracing::{info, warn};

use campus_mock_backend::auth::issue_token;
use campus_mock_backend::store::{MockStore, Seed};
use campus_mock_backend::{AppStateInner, MockOptions, router};

const DEV_SECRET: &str = "dev-secret-change-me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_mock_backend=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("CAMPUS_MOCK_JWT_SECRET").unwrap_or_else(|_| DEV_SECRET.into());
    if jwt_secret == DEV_SECRET {
        warn!("CAMPUS_MOCK_JWT_SECRET is unset, using the development secret");
    }
    let host = std::env::var("CAMPUS_MOCK_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("CAMPUS_MOCK_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let echo_sent_messages = std::env::var("CAMPUS_MOCK_ECHO")
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true);

    let store = MockStore::from_seed(Seed::demo());
    let state = AppStateInner::new(store, jwt_secret.clone(), MockOptions { echo_sent_messages });

    // Seed admin is user 1.
    let token = issue_token(&jwt_secret, 1, "Site Admin", "admin", 30)?;
    info!("Admin bearer token: {}", token);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Campus mock backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
