//! Runtime configuration from the environment.
//!
//! `.env` is loaded first (if present) so local runs behave like deployments
//! that export the variables directly.

use std::path::PathBuf;

use crate::error::AppError;
use crate::inference::DEFAULT_IMPUTATION_SEED;

pub const ENV_BUNDLE: &str = "CRISK_BUNDLE";
pub const ENV_LOG: &str = "CRISK_LOG";
pub const ENV_SEED: &str = "CRISK_SEED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Bundle used when a command is not given `--bundle`.
    pub bundle_path: Option<PathBuf>,
    /// Log filter directives (lower precedence than `--log`).
    pub log: Option<String>,
    /// Seed of the score-imputation stream used when scoring.
    pub seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bundle_path: None,
            log: None,
            seed: DEFAULT_IMPUTATION_SEED,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let seed = match get(ENV_SEED) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| AppError::new(2, format!("{ENV_SEED} must be a non-negative integer, got {raw:?}.")))?,
            None => DEFAULT_IMPUTATION_SEED,
        };

        Ok(Self {
            bundle_path: get(ENV_BUNDLE).map(PathBuf::from),
            log: get(ENV_LOG),
            seed,
        })
    }

    /// `explicit` if given, else the configured bundle.
    pub fn bundle_or(&self, explicit: Option<PathBuf>) -> Result<PathBuf, AppError> {
        explicit
            .or_else(|| self.bundle_path.clone())
            .ok_or_else(|| AppError::new(2, format!("No model bundle given (use --bundle or set {ENV_BUNDLE}).")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn unset_environment_gives_defaults() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn values_are_trimmed_and_parsed() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[
            (ENV_BUNDLE, " models/pd.json "),
            (ENV_LOG, "credit_risk=debug"),
            (ENV_SEED, "7"),
        ]))
        .unwrap();
        assert_eq!(cfg.bundle_path, Some(PathBuf::from("models/pd.json")));
        assert_eq!(cfg.log.as_deref(), Some("credit_risk=debug"));
        assert_eq!(cfg.seed, 7);
    }

    #[test]
    fn bad_seed_is_a_config_error() {
        let err = RuntimeConfig::from_lookup(lookup(&[(ENV_SEED, "-3")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn explicit_bundle_wins() {
        let cfg = RuntimeConfig::from_lookup(lookup(&[(ENV_BUNDLE, "a.json")])).unwrap();
        assert_eq!(cfg.bundle_or(Some("b.json".into())).unwrap(), PathBuf::from("b.json"));
        assert_eq!(cfg.bundle_or(None).unwrap(), PathBuf::from("a.json"));
        assert!(RuntimeConfig::default().bundle_or(None).is_err());
    }
}
