use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub llm_provider: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub history_window: usize,
    pub max_stored_turns: usize,
    pub session_ttl_minutes: i64,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub resume_pending_clarification: bool,
    pub default_city: String,
    pub order_list_limit: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "saathi.db".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "groq".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            history_window: parsed("HISTORY_WINDOW", 8),
            max_stored_turns: parsed("MAX_STORED_TURNS", 40),
            session_ttl_minutes: parsed("SESSION_TTL_MINUTES", 30),
            llm_timeout_secs: parsed("LLM_TIMEOUT_SECS", 20),
            llm_max_retries: parsed("LLM_MAX_RETRIES", 2),
            resume_pending_clarification: parsed("RESUME_PENDING_CLARIFICATION", true),
            default_city: env::var("DEFAULT_CITY").unwrap_or_else(|_| "Bengaluru".to_string()),
            order_list_limit: parsed("ORDER_LIST_LIMIT", 10),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: ":memory:".to_string(),
            llm_provider: "none".to_string(),
            groq_api_key: String::new(),
            groq_model: "llama-3.1-8b-instant".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            history_window: 8,
            max_stored_turns: 40,
            session_ttl_minutes: 30,
            llm_timeout_secs: 20,
            llm_max_retries: 2,
            resume_pending_clarification: true,
            default_city: "Bengaluru".to_string(),
            order_list_limit: 10,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
