use chauffeur_core::Company;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub company: Company,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_seconds: u64,
}

fn default_jwt_expiration() -> u64 {
    30 * 24 * 60 * 60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// A `postgres://` URL, or `memory://` for the in-process store.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Machine-local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `CHAUFFEUR_AUTH__JWT_SECRET=...` sets `auth.jwt_secret`
            .add_source(config::Environment::with_prefix("CHAUFFEUR").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_url_detection() {
        let db = DatabaseConfig { url: "memory://".into(), max_connections: 5 };
        assert!(db.is_memory());
        let db = DatabaseConfig {
            url: "postgres://localhost/chauffeur".into(),
            max_connections: 5,
        };
        assert!(!db.is_memory());
    }

    #[test]
    fn test_defaults_apply_when_keys_are_missing() {
        let s = config::Config::builder()
            .set_override("server.port", 5000)
            .unwrap()
            .set_override("database.url", "memory://")
            .unwrap()
            .set_override("auth.jwt_secret", "secret")
            .unwrap()
            .set_override("company.name", "Acme Limousines")
            .unwrap()
            .set_override("company.currency", "BHD")
            .unwrap()
            .build()
            .unwrap();
        let cfg: Config = s.try_deserialize().unwrap();
        assert_eq!(cfg.auth.jwt_expiration_seconds, 2_592_000);
        assert_eq!(cfg.database.max_connections, 5);
        assert!(cfg.company.address.is_empty());
    }
}
