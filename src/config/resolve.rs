//! Resolution pipeline: file → env expansion → profile → flags
//!
//! Validation is left to the caller so that it can decide how to report the
//! collected errors; [`resolve_validated`] bundles both steps.

use std::path::{Path, PathBuf};

use super::env::expand_env;
use super::error::ConfigError;
use super::loader::Loader;
use super::merge::{FlagSource, Merger};
use super::model::ConfigData;
use super::profile::ProfileManager;
use super::validate::Validator;

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Explicit config file; skips discovery when set.
    pub config_path: Option<PathBuf>,
    /// Profile to apply instead of the file's `active_profile`.
    pub profile: Option<String>,
    /// Override the discovery directories.
    pub search_dirs: Option<Vec<PathBuf>>,
}

/// Outcome of one resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: ConfigData,
    /// Config file that contributed, if any.
    pub source: Option<PathBuf>,
    /// Profile that was laid over the root sections.
    pub profile: String,
}

pub fn resolve(options: &ResolveOptions, flags: &dyn FlagSource) -> Result<Resolution, ConfigError> {
    let mut loader = Loader::new();
    if let Some(dirs) = &options.search_dirs {
        loader = loader.search_dirs(dirs.clone());
    }
    match &options.config_path {
        Some(path) => loader.load_path(path)?,
        None => loader.load()?,
    }
    let source = loader.source().map(Path::to_path_buf);
    let mut base = loader.into_data();

    expand_env(&mut base);

    let profile = match options.profile.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => base.effective_profile().to_string(),
    };
    let mut config = ProfileManager::new(&mut base).merge_profile(&profile)?;

    Merger::new(flags).merge_with_flags(&mut config);

    tracing::info!(
        "Resolved configuration (source: {}, profile: {}, model: {})",
        source.as_deref().map_or_else(|| "built-in defaults".to_string(), |p| p.display().to_string()),
        profile,
        config.defaults.model
    );
    Ok(Resolution { config, source, profile })
}

/// [`resolve`] followed by validation of the result.
pub fn resolve_validated(
    options: &ResolveOptions,
    flags: &dyn FlagSource,
) -> Result<Resolution, ConfigError> {
    let resolution = resolve(options, flags)?;
    Validator::new().validate(&resolution.config)?;
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::{flag, FlagSet};
    use std::fs;
    use tempfile::TempDir;

    const FILE: &str = "\
defaults:
  model: sonar-pro
  temperature: 0.5
search:
  recency: week
output:
  stream: true
profiles:
  research:
    name: research
    defaults:
      temperature: 0.1
    search:
      mode: academic
active_profile: research
";

    fn options_for(dir: &TempDir) -> ResolveOptions {
        ResolveOptions { search_dirs: Some(vec![dir.path().to_path_buf()]), ..Default::default() }
    }

    #[test]
    fn test_defaults_only_when_no_file() {
        let tmp = TempDir::new().expect("tmp");
        let resolution = resolve(&options_for(&tmp), &FlagSet::new()).expect("resolve");
        assert_eq!(resolution.config, ConfigData::builtin());
        assert!(resolution.source.is_none());
        assert_eq!(resolution.profile, "default");
    }

    #[test]
    fn test_file_value_survives_without_flag() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("pplx.yaml"), FILE).expect("write");

        let resolution = resolve(&options_for(&tmp), &FlagSet::new()).expect("resolve");
        let cfg = &resolution.config;
        assert_eq!(cfg.search.recency, "week");
        assert_eq!(cfg.search.mode, "academic", "active profile applied");
        assert_eq!(cfg.defaults.temperature, 0.1);
        assert_eq!(cfg.defaults.model, "sonar-pro");
        assert_eq!(cfg.api.timeout, "2m", "built-in default kept");
        assert_eq!(resolution.source, Some(tmp.path().join("pplx.yaml")));
    }

    #[test]
    fn test_precedence_flag_over_profile_over_file() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("pplx.yaml"), FILE).expect("write");

        let flags = FlagSet::new().set(flag::TEMPERATURE, 0.0);
        let resolution = resolve(&options_for(&tmp), &flags).expect("resolve");
        assert_eq!(resolution.config.defaults.temperature, 0.0);
    }

    #[test]
    fn test_explicit_profile_option_wins_over_active() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("pplx.yaml"), FILE).expect("write");

        let options = ResolveOptions { profile: Some("default".to_string()), ..options_for(&tmp) };
        let resolution = resolve(&options, &FlagSet::new()).expect("resolve");
        assert_eq!(resolution.profile, "default");
        assert_eq!(resolution.config.defaults.temperature, 0.5);
        assert_eq!(resolution.config.search.mode, "");
    }

    #[test]
    fn test_unknown_profile_is_fatal() {
        let tmp = TempDir::new().expect("tmp");
        let options = ResolveOptions { profile: Some("ghost".to_string()), ..options_for(&tmp) };
        let err = resolve(&options, &FlagSet::new()).expect_err("unknown profile");
        assert!(matches!(err, ConfigError::Profile(_)), "got {:?}", err);
    }

    #[test]
    fn test_invalid_flag_is_merged_but_rejected_by_validation() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("pplx.yaml"), FILE).expect("write");
        let flags = FlagSet::new().set(flag::SEARCH_RECENCY, "invalid");

        let resolution = resolve(&options_for(&tmp), &flags).expect("merge does not validate");
        assert_eq!(resolution.config.search.recency, "invalid");

        match resolve_validated(&options_for(&tmp), &flags) {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.contains_field("search.recency"), "got {}", errors)
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_env_expanded_after_load_and_before_profile_and_flags() {
        let var = "PPLX_RESOLVE_ENV_ORDER_TOKEN";
        std::env::set_var(var, "from-env");
        let tmp = TempDir::new().expect("tmp");
        let file = "\
defaults:
  model: $TOKEN
api:
  key: ${TOKEN}
  base_url: https://$TOKEN.example
output:
  image_domains: [\"$TOKEN\"]
profiles:
  env:
    name: env
    defaults:
      model: profile-model
active_profile: env
"
        .replace("TOKEN", var);
        fs::write(tmp.path().join("pplx.yaml"), file).expect("write");

        let plain = ResolveOptions { profile: Some("default".to_string()), ..options_for(&tmp) };
        let resolution = resolve(&plain, &FlagSet::new()).expect("resolve");
        assert_eq!(resolution.config.defaults.model, "from-env");
        assert_eq!(resolution.config.api.key, "from-env");
        assert_eq!(resolution.config.api.base_url, "https://from-env.example");
        assert_eq!(resolution.config.output.image_domains, vec!["from-env"]);

        let resolution = resolve(&options_for(&tmp), &FlagSet::new()).expect("resolve");
        assert_eq!(resolution.config.defaults.model, "profile-model", "profile beats expanded file value");
        assert_eq!(resolution.config.api.key, "from-env");

        let literal = format!("${}", var);
        let flags = FlagSet::new().set(flag::MODEL, literal.as_str());
        let resolution = resolve(&options_for(&tmp), &flags).expect("resolve");
        assert_eq!(resolution.config.defaults.model, literal, "flags win and are not expanded");
    }

    #[test]
    fn test_explicit_config_path_skips_discovery() {
        let tmp = TempDir::new().expect("tmp");
        let custom = tmp.path().join("custom.yml");
        fs::write(&custom, "search:\n  recency: day\n").expect("write");
        fs::write(tmp.path().join("pplx.yaml"), FILE).expect("write");

        let options = ResolveOptions { config_path: Some(custom.clone()), ..options_for(&tmp) };
        let resolution = resolve(&options, &FlagSet::new()).expect("resolve");
        assert_eq!(resolution.config.search.recency, "day");
        assert_eq!(resolution.source, Some(custom));
    }
}
