//! Configuration data model
//!
//! Every scalar uses its zero value (empty string, `0`, `0.0`, `false`) to mean
//! "not set by this layer". Whether a layer set a value explicitly is tracked by
//! presence at the capture boundaries (YAML keys, command-line flags), never by
//! comparing against zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the implicit profile built from the root sections.
pub const DEFAULT_PROFILE: &str = "default";

pub const DEFAULT_MODEL: &str = "sonar";
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_TIMEOUT: &str = "2m";

/// Root configuration aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigData {
    pub defaults: Defaults,
    pub search: Search,
    pub output: Output,
    pub api: Api,
    #[serde(with = "profile_map")]
    pub profiles: BTreeMap<String, Profile>,
    pub active_profile: String,
}

impl ConfigData {
    /// Configuration pre-populated with the built-in defaults.
    pub fn builtin() -> Self {
        let mut config = Self::default();
        config.defaults.model = DEFAULT_MODEL.to_string();
        config.api.base_url = DEFAULT_BASE_URL.to_string();
        config.api.timeout = DEFAULT_TIMEOUT.to_string();
        config
    }

    /// Name of the profile that should overlay the root sections.
    pub fn effective_profile(&self) -> &str {
        if self.active_profile.is_empty() {
            DEFAULT_PROFILE
        } else {
            &self.active_profile
        }
    }
}

/// Model selection and sampling parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: i64,
    pub top_k: i64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

/// Query filters applied by the search backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Search {
    pub domains: Vec<String>,
    pub recency: String,
    pub mode: String,
    pub context_size: String,
    pub location_lat: f64,
    pub location_lon: f64,
    pub location_country: String,
    pub after_date: String,
    pub before_date: String,
    pub last_updated_after: String,
    pub last_updated_before: String,
}

/// Response shaping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub stream: bool,
    pub return_images: bool,
    pub return_related: bool,
    pub json: bool,
    pub image_domains: Vec<String>,
    pub image_formats: Vec<String>,
    pub response_format_json_schema: String,
    pub response_format_regex: String,
    pub reasoning_effort: String,
}

/// Endpoint and credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Api {
    pub key: String,
    pub base_url: String,
    /// Request timeout in textual duration form, e.g. `30s` or `2m`.
    pub timeout: String,
}

/// A partial override bundle stored under its name in [`ConfigData::profiles`].
///
/// The name lives only in the map key. [`NamedProfile`] carries it across the
/// serialization boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub description: String,
    pub defaults: Defaults,
    pub search: Search,
    pub output: Output,
}

/// On-disk form of a profile: the profile plus its name.
///
/// Used for the records under `profiles:` and for export/import files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedProfile {
    pub name: String,
    pub description: String,
    pub defaults: Defaults,
    pub search: Search,
    pub output: Output,
}

impl NamedProfile {
    pub fn new(name: impl Into<String>, profile: Profile) -> Self {
        Self {
            name: name.into(),
            description: profile.description,
            defaults: profile.defaults,
            search: profile.search,
            output: profile.output,
        }
    }

    pub fn into_parts(self) -> (String, Profile) {
        let profile = Profile {
            description: self.description,
            defaults: self.defaults,
            search: self.search,
            output: self.output,
        };
        (self.name, profile)
    }
}

/// Serde glue for the profile map.
///
/// Records are written with a `name` taken from the key. On read, a record may
/// omit `name`; when present it must match the key.
mod profile_map {
    use super::{NamedProfile, Profile};
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct RecordRef<'a> {
        name: &'a str,
        description: &'a str,
        defaults: &'a super::Defaults,
        search: &'a super::Search,
        output: &'a super::Output,
    }

    pub fn serialize<S>(profiles: &BTreeMap<String, Profile>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(profiles.len()))?;
        for (name, profile) in profiles {
            let record = RecordRef {
                name,
                description: &profile.description,
                defaults: &profile.defaults,
                search: &profile.search,
                output: &profile.output,
            };
            map.serialize_entry(name, &record)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Profile>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records: Option<BTreeMap<String, Option<NamedProfile>>> =
            Option::deserialize(deserializer)?;

        let mut profiles = BTreeMap::new();
        for (key, record) in records.unwrap_or_default() {
            let (name, profile) = record.unwrap_or_default().into_parts();
            if !name.is_empty() && name != key {
                return Err(D::Error::custom(format!(
                    "profile stored under '{}' declares a different name '{}'",
                    key, name
                )));
            }
            profiles.insert(key, profile);
        }
        Ok(profiles)
    }
}
