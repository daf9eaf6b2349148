use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub request_timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub session_retention_hours: i64,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            database_url: "sqlite://protein_recipes.db".to_string(),
            db_max_connections: 20,
            db_min_connections: 5,
            request_timeout_secs: 30,
            rate_limit_per_minute: 100,
            session_retention_hours: 24,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Config::default();

        Ok(Config {
            server_host: std::env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", defaults.db_min_connections)?,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            rate_limit_per_minute: parse_var(
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            )?,
            session_retention_hours: parse_var(
                "SESSION_RETENTION_HOURS",
                defaults.session_retention_hours,
            )?,
            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes)?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let port: u16 = parse_var("PROTEIN_RECIPES_TEST_UNSET_PORT", 9090).unwrap();
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        std::env::set_var("PROTEIN_RECIPES_TEST_BAD_PORT", "eighty");
        let result: Result<u16, _> = parse_var("PROTEIN_RECIPES_TEST_BAD_PORT", 80);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_server_address() {
        let config = Config::default();
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }
}
