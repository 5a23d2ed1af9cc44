use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use saathi::config::AppConfig;
use saathi::db;
use saathi::handlers;
use saathi::services::ai::groq::GroqProvider;
use saathi::services::ai::ollama::OllamaProvider;
use saathi::services::ai::LlmProvider;
use saathi::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

fn build_llm(config: &AppConfig) -> Option<Box<dyn LlmProvider>> {
    match config.llm_provider.as_str() {
        "groq" if config.groq_api_key.is_empty() => {
            tracing::warn!("GROQ_API_KEY not set, generative replies are disabled");
            None
        }
        "groq" => {
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Some(Box::new(GroqProvider::new(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
            )))
        }
        "ollama" => {
            tracing::info!(
                "using Ollama LLM provider (url: {}, model: {})",
                config.ollama_url,
                config.ollama_model
            );
            Some(Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            )))
        }
        other => {
            tracing::info!(provider = other, "no LLM provider configured");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    let conn = db::init_db(&config.database_url)?;
    let llm = build_llm(&config);

    let state = Arc::new(AppState::new(config.clone(), conn, llm));

    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let now = chrono::Local::now().naive_local();
                match state.sessions.purge_expired(now) {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(purged = n, "expired conversations removed"),
                    Err(e) => tracing::warn!(error = ?e, "conversation sweep failed"),
                }
            }
        });
    }

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
