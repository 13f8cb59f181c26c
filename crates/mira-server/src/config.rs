use clap::Parser;
use mira_adapter_pg::{DirectQueryOptions, TlsPolicy};
use mira_runtime::ChatCompletionConfig;
use mira_runtime::DEFAULT_MANAGED_BASE_URL;
use mira_runtime::generator::{DEFAULT_COMPLETION_ENDPOINT, DEFAULT_COMPLETION_MODEL};
use std::path::Path;
use std::time::Duration;

/// Server configuration. Every flag can also be set through the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "mira-server", version, about = "Natural-language database query backend")]
pub struct ServerConfig {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// API key for the managed service. Also used for the completion
    /// endpoint unless `--llm-api-key` is given.
    #[arg(long, env = "MIRA_API_KEY", default_value = "", hide_env_values = true)]
    pub mira_api_key: String,

    /// Base URL of the managed query service.
    #[arg(long, env = "MIRA_BASE_URL", default_value = DEFAULT_MANAGED_BASE_URL)]
    pub mira_base_url: String,

    /// Chat-completion endpoint used by the direct path.
    #[arg(long, env = "LLM_ENDPOINT", default_value = DEFAULT_COMPLETION_ENDPOINT)]
    pub llm_endpoint: String,

    /// Model name sent to the completion endpoint.
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
    pub llm_model: String,

    /// Bearer key for the completion endpoint.
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Bound on establishing a database connection, in seconds.
    #[arg(long, env = "DB_CONNECT_TIMEOUT_SECS", default_value_t = 30)]
    pub db_connect_timeout_secs: u64,

    /// Verify database server certificates. Off by default: TLS is used
    /// without checking the peer certificate.
    #[arg(long, env = "DB_TLS_VERIFY")]
    pub db_tls_verify: bool,

    /// Tracing filter directive, e.g. "info" or "mira_adapter_pg=debug".
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mira_api_key: String::new(),
            mira_base_url: DEFAULT_MANAGED_BASE_URL.to_string(),
            llm_endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
            llm_model: DEFAULT_COMPLETION_MODEL.to_string(),
            llm_api_key: None,
            db_connect_timeout_secs: 30,
            db_tls_verify: false,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Key for the completion endpoint, falling back to the managed key.
    pub fn llm_api_key(&self) -> &str {
        self.llm_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.mira_api_key)
    }

    pub fn completion_config(&self) -> ChatCompletionConfig {
        ChatCompletionConfig {
            endpoint: self.llm_endpoint.clone(),
            model: self.llm_model.clone(),
            ..Default::default()
        }
    }

    pub fn direct_options(&self) -> DirectQueryOptions {
        DirectQueryOptions {
            connect_timeout: Duration::from_secs(self.db_connect_timeout_secs),
            tls_policy: if self.db_tls_verify {
                TlsPolicy::Verify
            } else {
                TlsPolicy::AcceptInvalidCerts
            },
        }
    }

    /// `***` plus the last four characters of the managed key, or `NOT SET`.
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.mira_api_key)
    }
}

/// Read a `.env` file into the process environment. Variables that are
/// already set keep their values. Returns `Ok(false)` when the file is absent.
pub fn load_env_file(path: &Path) -> Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "NOT SET".to_string();
    }
    let chars: Vec<char> = secret.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("***{}", tail)
}
