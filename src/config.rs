use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database holding the vote ledger
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Plex account token, only needed by clients talking to the catalog
    #[serde(default)]
    pub plex_token: Option<String>,

    /// Plex discover API base URL
    #[serde(default = "default_plex_api_url")]
    pub plex_api_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of people expected to vote on every movie
    #[serde(default = "default_participant_count")]
    pub participant_count: u32,
}

fn default_database_url() -> String {
    "sqlite://data/reelmatch.sqlite".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_plex_api_url() -> String {
    "https://discover.provider.plex.tv".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_participant_count() -> u32 {
    2
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.participant_count == 0 {
            anyhow::bail!("PARTICIPANT_COUNT must be at least 1");
        }
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.database_url, "sqlite://data/reelmatch.sqlite");
        assert_eq!(config.participant_count, 2);
        assert_eq!(config.port, 3000);
        assert_eq!(config.plex_token, None);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("PORT", "8080"),
            ("PARTICIPANT_COUNT", "3"),
            ("PLEX_TOKEN", "abc"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.participant_count, 3);
        assert_eq!(config.plex_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_zero_participants_rejected() {
        let config = from_pairs(&[("PARTICIPANT_COUNT", "0")]);
        assert!(config.validate().is_err());
    }
}
