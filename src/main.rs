mod db;
mod llm;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::llm::CompletionUpstream;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    // Initialize the completion upstream (non-fatal: the relay answers 503 without it).
    let upstream: Option<Arc<dyn CompletionUpstream>> = match llm::OpenAiClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "completion upstream initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "completion upstream not configured; relay disabled");
            None
        }
    };

    let auth = services::auth::AuthConfig::from_env().expect("invalid auth configuration");
    if auth.dev_bypass() {
        tracing::warn!("AUTH_DEV_BYPASS enabled; X-Dev-User is trusted without verification");
    } else if !auth.has_key() {
        tracing::warn!("no AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY set; every request will be rejected");
    }

    let relay = services::relay::RelayConfig::from_env();
    let rate_limiter = rate_limit::RateLimiter::new(rate_limit::RateLimitConfig::from_env());
    let state = state::AppState::new(pool, upstream, auth, relay, rate_limiter);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "chatrelay listening");
    axum::serve(listener, app).await.expect("server failed");
}
