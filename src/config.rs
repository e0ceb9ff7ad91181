use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::autocomplete::DEFAULT_FALLBACK_POOL;
use crate::knowledge_base::DEFAULT_SIMILARITY_THRESHOLD;
use crate::predictor::PredictorConfig;

pub const INSTALLED_SOURCE_NAME: &str = "questions.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub upload_dir: PathBuf,
    pub similarity_threshold: f32,
    pub match_limit: usize,
    pub suggestion_limit: usize,
    pub word_limit: usize,
    pub question_limit: usize,
    pub fallback_pool: usize,
    pub predictor_url: Option<String>,
    pub predictor_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/questions.json"),
            upload_dir: default_upload_dir(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            match_limit: 5,
            suggestion_limit: 3,
            word_limit: 5,
            question_limit: 3,
            fallback_pool: DEFAULT_FALLBACK_POOL,
            predictor_url: None,
            predictor_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` returns
    /// for each `CODEOPT_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            data_path: lookup("CODEOPT_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            upload_dir: lookup("CODEOPT_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            similarity_threshold: load_threshold(&lookup, "CODEOPT_SIMILARITY_THRESHOLD", defaults.similarity_threshold),
            match_limit: try_load(&lookup, "CODEOPT_MATCH_LIMIT", defaults.match_limit),
            suggestion_limit: try_load(&lookup, "CODEOPT_SUGGESTION_LIMIT", defaults.suggestion_limit),
            word_limit: try_load(&lookup, "CODEOPT_WORD_LIMIT", defaults.word_limit),
            question_limit: try_load(&lookup, "CODEOPT_QUESTION_LIMIT", defaults.question_limit),
            fallback_pool: try_load(&lookup, "CODEOPT_FALLBACK_POOL", defaults.fallback_pool),
            predictor_url: lookup("CODEOPT_PREDICTOR_URL").filter(|url| !url.trim().is_empty()),
            predictor_timeout_secs: try_load(&lookup, "CODEOPT_PREDICTOR_TIMEOUT", defaults.predictor_timeout_secs),
        }
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            url: self.predictor_url.clone(),
            timeout: Duration::from_secs(self.predictor_timeout_secs),
        }
    }

    pub fn installed_source_path(&self) -> PathBuf {
        self.upload_dir.join(INSTALLED_SOURCE_NAME)
    }
}

fn default_upload_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("codeoptimizer").join("uploads"))
        .unwrap_or_else(|| PathBuf::from("uploads"))
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

/// Similarity thresholds must lie in [0, 1]; NaN and infinities are rejected.
fn load_threshold(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f32) -> f32 {
    let value = try_load(lookup, key, default);
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        warn!("{key} value {value} is outside [0, 1], using default: {default}");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.similarity_threshold, 0.1);
        assert_eq!(config.fallback_pool, 50);
        assert!(config.predictor_url.is_none());
    }

    #[test]
    fn test_overrides_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("CODEOPT_DATA_PATH", "/srv/questions"),
            ("CODEOPT_SIMILARITY_THRESHOLD", "0.25"),
            ("CODEOPT_MATCH_LIMIT", " 8 "),
            ("CODEOPT_PREDICTOR_URL", "http://localhost:8000/predict"),
        ]));

        assert_eq!(config.data_path, PathBuf::from("/srv/questions"));
        assert_eq!(config.similarity_threshold, 0.25);
        assert_eq!(config.match_limit, 8);
        assert_eq!(config.predictor_url.as_deref(), Some("http://localhost:8000/predict"));
        assert_eq!(config.predictor_config().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("CODEOPT_WORD_LIMIT", "lots"),
            ("CODEOPT_PREDICTOR_URL", "  "),
        ]));

        assert_eq!(config.word_limit, 5);
        assert!(config.predictor_url.is_none());
    }

    #[test]
    fn test_out_of_range_threshold_keeps_default() {
        for raw in ["NaN", "inf", "1.5", "-0.2"] {
            let config = Config::from_lookup(lookup_from(&[("CODEOPT_SIMILARITY_THRESHOLD", raw)]));
            assert_eq!(config.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD, "{raw}");
        }

        let config = Config::from_lookup(lookup_from(&[("CODEOPT_SIMILARITY_THRESHOLD", "1")]));
        assert_eq!(config.similarity_threshold, 1.0);
    }
}
