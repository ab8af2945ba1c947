//! Environment variable expansion for selected config fields
//!
//! Only the fields that commonly hold secrets, endpoints or per-machine values
//! are expanded: `api.key`, `api.base_url`, `api.timeout`, `defaults.model`,
//! `search.domains`, `search.location_country`, `output.image_domains` and
//! `output.image_formats`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::model::ConfigData;

static VAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid env var regex")
});

/// Expand `$NAME` and `${NAME}` against the process environment.
pub fn expand_env(config: &mut ConfigData) {
    expand_env_with(config, |name| std::env::var(name).ok());
}

/// Expand using `lookup`; names it does not resolve become the empty string.
pub fn expand_env_with<F>(config: &mut ConfigData, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let expand = |value: &mut String| {
        if value.contains('$') {
            *value = expand_str(value, &lookup);
        }
    };

    expand(&mut config.api.key);
    expand(&mut config.api.base_url);
    expand(&mut config.api.timeout);
    expand(&mut config.defaults.model);
    expand(&mut config.search.location_country);
    for value in config
        .search
        .domains
        .iter_mut()
        .chain(config.output.image_domains.iter_mut())
        .chain(config.output.image_formats.iter_mut())
    {
        expand(value);
    }
}

pub fn expand_str<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VAR_RE
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| {
                tracing::warn!("Environment variable {} is not set, expanding to empty", name);
                String::new()
            })
        })
        .into_owned()
}
