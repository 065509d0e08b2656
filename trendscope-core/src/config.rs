use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Application configuration. Constructed once at startup and handed to the
/// services that need it; there are no process-wide configuration globals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reddit: RedditConfig,
    pub api: ApiConfig,
    pub rate_limit_requests_per_minute: u32,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub collection: CollectionDefaults,
    pub subreddits: SubredditGroups,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: String,
    pub post_expiry_hours: i64,
    pub comment_expiry_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub reports_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionDefaults {
    pub posts_per_subreddit: u32,
    pub time_period_days: i64,
    pub top_comments_limit: u32,
}

/// Target subreddits grouped by interest category.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubredditGroups {
    pub ai_ml: Vec<String>,
    pub running: Vec<String>,
    pub nutrition: Vec<String>,
    pub strength_training: Vec<String>,
}

impl SubredditGroups {
    /// Union of every configured category, in category order.
    pub fn all(&self) -> Vec<String> {
        self.ai_ml
            .iter()
            .chain(&self.running)
            .chain(&self.nutrition)
            .chain(&self.strength_training)
            .cloned()
            .collect()
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: "rust:trendscope:v0.1.0 (by /u/trendscope)".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "data/cache".to_string(),
            post_expiry_hours: 1,
            comment_expiry_minutes: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            reports_dir: "data/reports".to_string(),
        }
    }
}

impl Default for CollectionDefaults {
    fn default() -> Self {
        Self {
            posts_per_subreddit: 100,
            time_period_days: 7,
            top_comments_limit: 10,
        }
    }
}

impl Default for SubredditGroups {
    fn default() -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(|s| s.to_string()).collect()
        }

        Self {
            ai_ml: owned(&[
                "ChatGPT",
                "MachineLearning",
                "artificial",
                "learnmachinelearning",
                "OpenAI",
                "ArtificialIntelligence",
                "datascience",
                "deeplearning",
                "LocalLLaMA",
                "AIPromptProgramming",
            ]),
            running: owned(&[
                "running",
                "AdvancedRunning",
                "RunningShoeGeeks",
                "C25K",
                "ultrarunning",
            ]),
            nutrition: owned(&["nutrition", "EatCheapAndHealthy", "keto", "loseit", "fitmeals"]),
            strength_training: owned(&[
                "weightroom",
                "bodybuilding",
                "Fitness",
                "gainit",
                "naturalbodybuilding",
            ]),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reddit: RedditConfig::default(),
            api: ApiConfig::default(),
            rate_limit_requests_per_minute: 60,
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            collection: CollectionDefaults::default(),
            subreddits: SubredditGroups::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: optional TOML file (`TRENDSCOPE_CONFIG` or
    /// `trendscope.toml` in the working directory), then environment
    /// overrides, then validation of the Reddit credentials.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("TRENDSCOPE_CONFIG").unwrap_or_else(|_| "trendscope.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            let raw = fs::read_to_string(&path).map_err(|e| ConfigError::InvalidValue {
                field: "config_file".to_string(),
                value: format!("{path}: {e}"),
            })?;
            toml::from_str(&raw)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;

        if config.reddit.client_id.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                var_name: "REDDIT_CLIENT_ID".to_string(),
            });
        }
        if config.reddit.client_secret.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                var_name: "REDDIT_CLIENT_SECRET".to_string(),
            });
        }

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var("REDDIT_CLIENT_ID") {
            self.reddit.client_id = v;
        }
        if let Ok(v) = env::var("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = v;
        }
        if let Ok(v) = env::var("REDDIT_USER_AGENT") {
            self.reddit.user_agent = v;
        }
        if let Ok(v) = env::var("TRENDSCOPE_HOST") {
            self.api.host = v;
        }
        if let Ok(v) = env::var("TRENDSCOPE_PORT") {
            self.api.port = parse_env("TRENDSCOPE_PORT", &v)?;
        }
        if let Ok(v) = env::var("TRENDSCOPE_RATE_LIMIT_RPM") {
            self.rate_limit_requests_per_minute = parse_env("TRENDSCOPE_RATE_LIMIT_RPM", &v)?;
        }
        if let Ok(v) = env::var("TRENDSCOPE_CACHE_DIR") {
            self.cache.dir = v;
        }
        if let Ok(v) = env::var("TRENDSCOPE_DATA_DIR") {
            self.storage.data_dir = v;
        }
        if let Ok(v) = env::var("TRENDSCOPE_REPORTS_DIR") {
            self.storage.reports_dir = v;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.rate_limit_requests_per_minute, 60);
        assert_eq!(config.cache.post_expiry_hours, 1);
        assert_eq!(config.cache.comment_expiry_minutes, 30);
        assert_eq!(config.collection.posts_per_subreddit, 100);
        assert_eq!(config.api.port, 8000);
    }

    #[test]
    fn test_all_subreddits_is_category_union() {
        let groups = SubredditGroups::default();
        let all = groups.all();
        assert_eq!(
            all.len(),
            groups.ai_ml.len()
                + groups.running.len()
                + groups.nutrition.len()
                + groups.strength_training.len()
        );
        assert_eq!(all[0], "ChatGPT");
        assert!(all.contains(&"ultrarunning".to_string()));
    }

    #[test]
    fn test_toml_partial_override() {
        let raw = r#"
            rate_limit_requests_per_minute = 30

            [cache]
            post_expiry_hours = 2
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.rate_limit_requests_per_minute, 30);
        assert_eq!(config.cache.post_expiry_hours, 2);
        // Untouched sections keep their defaults.
        assert_eq!(config.cache.comment_expiry_minutes, 30);
        assert_eq!(config.api.port, 8000);
    }
}
