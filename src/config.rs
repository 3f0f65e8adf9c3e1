use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub conversion: ConversionConfig,
    pub ai: AiConfig,
    pub query: QueryConfig,
    pub usage: UsageConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub client_timeout: Duration,
    pub keep_alive: Duration,
    pub max_payload_size: usize,
    pub cors_origins: Vec<String>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Bearer token to owner id.
    pub api_tokens: HashMap<String, String>,
}

#[derive(Clone)]
pub struct ConversionConfig {
    pub max_file_size_mb: u64,
    pub max_text_length: usize,
    pub tool_timeout: Duration,
    pub libreoffice_command: String,
    pub ghostscript_command: String,
    pub qpdf_command: String,
}

#[derive(Clone)]
pub struct AiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

#[derive(Clone, Copy)]
pub struct QueryConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Clone, Copy)]
pub struct UsageConfig {
    pub default_days: u32,
    pub max_days: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 25,
            max_text_length: 20_000,
            tool_timeout: Duration::from_secs(120),
            libreoffice_command: "soffice".to_string(),
            ghostscript_command: "gs".to_string(),
            qpdf_command: "qpdf".to_string(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: 2048,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { default_limit: 50, max_limit: 100 }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self { default_days: 30, max_days: 365 }
    }
}

/// Parses `token=owner,token=owner`. Malformed entries are skipped.
pub fn parse_api_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|entry| {
            let (token, owner) = entry.trim().split_once('=')?;
            let (token, owner) = (token.trim(), owner.trim());
            if token.is_empty() || owner.is_empty() {
                return None;
            }
            Some((token.to_string(), owner.to_string()))
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        let parse_env_var = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_env_number = |key: &str, default: u64| -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };

        let parse_env_duration = |key: &str, default_secs: u64| -> Duration {
            Duration::from_secs(parse_env_number(key, default_secs))
        };

        let conversion_defaults = ConversionConfig::default();
        let ai_defaults = AiConfig::default();
        let query_defaults = QueryConfig::default();
        let usage_defaults = UsageConfig::default();

        Config {
            server: ServerConfig {
                host: parse_env_var("CONVERTKIT_HOST", "0.0.0.0"),
                port: parse_env_number("CONVERTKIT_PORT", 8080) as u16,
                client_timeout: parse_env_duration("CONVERTKIT_CLIENT_TIMEOUT", 120),
                keep_alive: parse_env_duration("CONVERTKIT_KEEP_ALIVE", 75),
                max_payload_size: parse_env_number("CONVERTKIT_MAX_PAYLOAD", 64 * 1024 * 1024) as usize,
                cors_origins: parse_env_var("CONVERTKIT_CORS_ORIGINS", "http://localhost:3000")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                url: parse_env_var("CONVERTKIT_DATABASE_URL", "sqlite:///app/storage/convertkit.db"),
                max_connections: std::env::var("CONVERTKIT_DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            auth: AuthConfig {
                api_tokens: parse_api_tokens(&parse_env_var("CONVERTKIT_API_TOKENS", "")),
            },
            conversion: ConversionConfig {
                max_file_size_mb: parse_env_number("CONVERTKIT_MAX_FILE_SIZE_MB", conversion_defaults.max_file_size_mb),
                max_text_length: parse_env_number("CONVERTKIT_MAX_TEXT_LENGTH", conversion_defaults.max_text_length as u64) as usize,
                tool_timeout: parse_env_duration("CONVERTKIT_TOOL_TIMEOUT", conversion_defaults.tool_timeout.as_secs()),
                libreoffice_command: parse_env_var("CONVERTKIT_LIBREOFFICE_COMMAND", &conversion_defaults.libreoffice_command),
                ghostscript_command: parse_env_var("CONVERTKIT_GHOSTSCRIPT_COMMAND", &conversion_defaults.ghostscript_command),
                qpdf_command: parse_env_var("CONVERTKIT_QPDF_COMMAND", &conversion_defaults.qpdf_command),
            },
            ai: AiConfig {
                endpoint: parse_env_var("CONVERTKIT_AI_ENDPOINT", &ai_defaults.endpoint)
                    .trim_end_matches('/')
                    .to_string(),
                api_key: std::env::var("CONVERTKIT_AI_API_KEY").ok().filter(|k| !k.is_empty()),
                model: parse_env_var("CONVERTKIT_AI_MODEL", &ai_defaults.model),
                timeout: parse_env_duration("CONVERTKIT_AI_TIMEOUT", ai_defaults.timeout.as_secs()),
                max_tokens: parse_env_number("CONVERTKIT_AI_MAX_TOKENS", ai_defaults.max_tokens as u64) as u32,
            },
            query: QueryConfig {
                default_limit: parse_env_number("CONVERTKIT_DEFAULT_LIST_LIMIT", query_defaults.default_limit as u64) as u32,
                max_limit: parse_env_number("CONVERTKIT_MAX_LIST_LIMIT", query_defaults.max_limit as u64) as u32,
            },
            usage: UsageConfig {
                default_days: parse_env_number("CONVERTKIT_DEFAULT_USAGE_DAYS", usage_defaults.default_days as u64) as u32,
                max_days: parse_env_number("CONVERTKIT_MAX_USAGE_DAYS", usage_defaults.max_days as u64) as u32,
            },
        }
    }
}

pub fn load_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_owner_pairs() {
        let tokens = parse_api_tokens(" abc=alice, def = bob ,broken,=nobody,ghost=");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.get("abc").map(String::as_str), Some("alice"));
        assert_eq!(tokens.get("def").map(String::as_str), Some("bob"));
    }

    #[test]
    fn empty_token_list_yields_no_identities() {
        assert!(parse_api_tokens("").is_empty());
    }
}
