//! Command-line flag overlay
//!
//! A flag only overrides the configuration when the user supplied it on the
//! command line. An explicit zero (`--temperature=0`) therefore wins over a
//! configured value, while an absent flag never touches it.

use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;
use std::time::Duration;

use super::model::ConfigData;

/// Recognized flag names. These double as clap argument ids.
pub mod flag {
    pub const MODEL: &str = "model";
    pub const TEMPERATURE: &str = "temperature";
    pub const MAX_TOKENS: &str = "max-tokens";
    pub const TOP_K: &str = "top-k";
    pub const TOP_P: &str = "top-p";
    pub const FREQUENCY_PENALTY: &str = "frequency-penalty";
    pub const PRESENCE_PENALTY: &str = "presence-penalty";

    pub const SEARCH_DOMAINS: &str = "search-domains";
    pub const SEARCH_RECENCY: &str = "search-recency";
    pub const SEARCH_MODE: &str = "search-mode";
    pub const SEARCH_CONTEXT_SIZE: &str = "search-context-size";
    pub const LOCATION_LAT: &str = "location-lat";
    pub const LOCATION_LON: &str = "location-lon";
    pub const LOCATION_COUNTRY: &str = "location-country";
    pub const SEARCH_AFTER_DATE: &str = "search-after-date";
    pub const SEARCH_BEFORE_DATE: &str = "search-before-date";
    pub const LAST_UPDATED_AFTER: &str = "last-updated-after";
    pub const LAST_UPDATED_BEFORE: &str = "last-updated-before";

    pub const STREAM: &str = "stream";
    pub const RETURN_IMAGES: &str = "return-images";
    pub const RETURN_RELATED: &str = "return-related";
    pub const JSON: &str = "json";
    pub const IMAGE_DOMAINS: &str = "image-domains";
    pub const IMAGE_FORMATS: &str = "image-formats";
    pub const RESPONSE_FORMAT_JSON_SCHEMA: &str = "response-format-json-schema";
    pub const RESPONSE_FORMAT_REGEX: &str = "response-format-regex";
    pub const REASONING_EFFORT: &str = "reasoning-effort";

    pub const API_KEY: &str = "api-key";
    pub const BASE_URL: &str = "base-url";
    pub const TIMEOUT: &str = "timeout";

    pub const ALL: [&str; 30] = [
        MODEL,
        TEMPERATURE,
        MAX_TOKENS,
        TOP_K,
        TOP_P,
        FREQUENCY_PENALTY,
        PRESENCE_PENALTY,
        SEARCH_DOMAINS,
        SEARCH_RECENCY,
        SEARCH_MODE,
        SEARCH_CONTEXT_SIZE,
        LOCATION_LAT,
        LOCATION_LON,
        LOCATION_COUNTRY,
        SEARCH_AFTER_DATE,
        SEARCH_BEFORE_DATE,
        LAST_UPDATED_AFTER,
        LAST_UPDATED_BEFORE,
        STREAM,
        RETURN_IMAGES,
        RETURN_RELATED,
        JSON,
        IMAGE_DOMAINS,
        IMAGE_FORMATS,
        RESPONSE_FORMAT_JSON_SCHEMA,
        RESPONSE_FORMAT_REGEX,
        REASONING_EFFORT,
        API_KEY,
        BASE_URL,
        TIMEOUT,
    ];
}

/// Register every recognized flag on `cmd`.
///
/// Each flag's argument id is its name, which is what [`FlagSource`] looks up.
pub fn bind_flags(cmd: Command) -> Command {
    cmd.next_help_heading("Model")
        .arg(string_arg(flag::MODEL, "MODEL", "Model to query").short('m'))
        .arg(float_arg(flag::TEMPERATURE, "Sampling temperature, 0 to 2"))
        .arg(int_arg(flag::MAX_TOKENS, "Maximum tokens in the response"))
        .arg(int_arg(flag::TOP_K, "Top-k sampling cutoff"))
        .arg(float_arg(flag::TOP_P, "Nucleus sampling threshold, 0 to 1"))
        .arg(float_arg(flag::FREQUENCY_PENALTY, "Frequency penalty, 0 to 2"))
        .arg(float_arg(flag::PRESENCE_PENALTY, "Presence penalty, 0 to 2"))
        .next_help_heading("Search")
        .arg(list_arg(flag::SEARCH_DOMAINS, "DOMAINS", "Restrict search to these domains"))
        .arg(string_arg(flag::SEARCH_RECENCY, "RECENCY", "hour, day, week, month or year"))
        .arg(string_arg(flag::SEARCH_MODE, "MODE", "web or academic"))
        .arg(string_arg(flag::SEARCH_CONTEXT_SIZE, "SIZE", "low, medium or high"))
        .arg(float_arg(flag::LOCATION_LAT, "Latitude used to localize results"))
        .arg(float_arg(flag::LOCATION_LON, "Longitude used to localize results"))
        .arg(string_arg(flag::LOCATION_COUNTRY, "CODE", "Country code used to localize results"))
        .arg(string_arg(flag::SEARCH_AFTER_DATE, "MM/DD/YYYY", "Only sources published after this date"))
        .arg(string_arg(flag::SEARCH_BEFORE_DATE, "MM/DD/YYYY", "Only sources published before this date"))
        .arg(string_arg(flag::LAST_UPDATED_AFTER, "MM/DD/YYYY", "Only sources updated after this date"))
        .arg(string_arg(flag::LAST_UPDATED_BEFORE, "MM/DD/YYYY", "Only sources updated before this date"))
        .next_help_heading("Output")
        .arg(bool_arg(flag::STREAM, "Stream the response"))
        .arg(bool_arg(flag::RETURN_IMAGES, "Include images in the response"))
        .arg(bool_arg(flag::RETURN_RELATED, "Include related questions"))
        .arg(bool_arg(flag::JSON, "Print machine-readable JSON"))
        .arg(list_arg(flag::IMAGE_DOMAINS, "DOMAINS", "Only return images from these domains"))
        .arg(list_arg(flag::IMAGE_FORMATS, "FORMATS", "Only return images in these formats"))
        .arg(string_arg(flag::RESPONSE_FORMAT_JSON_SCHEMA, "SCHEMA", "JSON schema for structured output"))
        .arg(string_arg(flag::RESPONSE_FORMAT_REGEX, "REGEX", "Regex for structured output"))
        .arg(string_arg(flag::REASONING_EFFORT, "EFFORT", "low, medium or high"))
        .next_help_heading("API")
        .arg(string_arg(flag::API_KEY, "KEY", "API key"))
        .arg(string_arg(flag::BASE_URL, "URL", "API base URL"))
        .arg(
            Arg::new(flag::TIMEOUT)
                .long(flag::TIMEOUT)
                .value_name("DURATION")
                .value_parser(parse_duration)
                .help("Request timeout, e.g. 30s or 2m"),
        )
        .next_help_heading(None::<&str>)
}

fn string_arg(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).value_name(value_name).help(help)
}

fn float_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("FLOAT")
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .help(help)
}

fn int_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("INT")
        .value_parser(value_parser!(i64))
        .allow_negative_numbers(true)
        .help(help)
}

// `--stream` means true; `--stream=false` is an explicit false.
fn bool_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("BOOL")
        .num_args(0..=1)
        .require_equals(true)
        .default_missing_value("true")
        .value_parser(value_parser!(bool))
        .action(ArgAction::Set)
        .help(help)
}

fn list_arg(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name(value_name)
        .value_delimiter(',')
        .action(ArgAction::Append)
        .help(help)
}

/// Flag values together with whether the user supplied them.
///
/// Typed accessors return `None` when the flag is unknown or holds a value of
/// another type.
pub trait FlagSource {
    fn is_provided(&self, name: &str) -> bool;
    fn string(&self, name: &str) -> Option<String>;
    fn float(&self, name: &str) -> Option<f64>;
    fn int(&self, name: &str) -> Option<i64>;
    fn boolean(&self, name: &str) -> Option<bool>;
    fn strings(&self, name: &str) -> Option<Vec<String>>;
    fn duration(&self, name: &str) -> Option<Duration>;
}

/// Parsed clap matches. Only values whose source is the command line count
/// as provided; defaults and environment fallbacks do not.
impl FlagSource for ArgMatches {
    fn is_provided(&self, name: &str) -> bool {
        self.ids().any(|id| id.as_str() == name)
            && self.value_source(name) == Some(ValueSource::CommandLine)
    }

    fn string(&self, name: &str) -> Option<String> {
        self.try_get_one::<String>(name).ok().flatten().cloned()
    }

    fn float(&self, name: &str) -> Option<f64> {
        self.try_get_one::<f64>(name).ok().flatten().copied()
    }

    fn int(&self, name: &str) -> Option<i64> {
        self.try_get_one::<i64>(name).ok().flatten().copied()
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        self.try_get_one::<bool>(name).ok().flatten().copied()
    }

    fn strings(&self, name: &str) -> Option<Vec<String>> {
        self.try_get_many::<String>(name).ok().flatten().map(|values| values.cloned().collect())
    }

    fn duration(&self, name: &str) -> Option<Duration> {
        self.try_get_one::<Duration>(name).ok().flatten().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Str(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Duration(Duration),
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Str(value.to_string())
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Float(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(value: Vec<String>) -> Self {
        FlagValue::List(value)
    }
}

impl From<Duration> for FlagValue {
    fn from(value: Duration) -> Self {
        FlagValue::Duration(value)
    }
}

/// In-memory flag source: every entry counts as explicitly provided.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    values: BTreeMap<String, FlagValue>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<FlagValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
}

impl FlagSource for FlagSet {
    fn is_provided(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn string(&self, name: &str) -> Option<String> {
        match self.values.get(name) {
            Some(FlagValue::Str(v)) => Some(v.clone()),
            _ => None,
        }
    }

    fn float(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(FlagValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(FlagValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(FlagValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    fn strings(&self, name: &str) -> Option<Vec<String>> {
        match self.values.get(name) {
            Some(FlagValue::List(v)) => Some(v.clone()),
            _ => None,
        }
    }

    fn duration(&self, name: &str) -> Option<Duration> {
        match self.values.get(name) {
            Some(FlagValue::Duration(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Overlays explicitly provided flags onto a configuration.
pub struct Merger<'f> {
    flags: &'f dyn FlagSource,
}

impl<'f> Merger<'f> {
    pub fn new(flags: &'f dyn FlagSource) -> Self {
        Self { flags }
    }

    /// Apply every provided flag. Does not validate.
    pub fn merge_with_flags(&self, config: &mut ConfigData) {
        let d = &mut config.defaults;
        self.merge_string(flag::MODEL, &mut d.model);
        self.merge_float(flag::TEMPERATURE, &mut d.temperature);
        self.merge_int(flag::MAX_TOKENS, &mut d.max_tokens);
        self.merge_int(flag::TOP_K, &mut d.top_k);
        self.merge_float(flag::TOP_P, &mut d.top_p);
        self.merge_float(flag::FREQUENCY_PENALTY, &mut d.frequency_penalty);
        self.merge_float(flag::PRESENCE_PENALTY, &mut d.presence_penalty);

        let s = &mut config.search;
        self.merge_strings(flag::SEARCH_DOMAINS, &mut s.domains);
        self.merge_string(flag::SEARCH_RECENCY, &mut s.recency);
        self.merge_string(flag::SEARCH_MODE, &mut s.mode);
        self.merge_string(flag::SEARCH_CONTEXT_SIZE, &mut s.context_size);
        self.merge_float(flag::LOCATION_LAT, &mut s.location_lat);
        self.merge_float(flag::LOCATION_LON, &mut s.location_lon);
        self.merge_string(flag::LOCATION_COUNTRY, &mut s.location_country);
        self.merge_string(flag::SEARCH_AFTER_DATE, &mut s.after_date);
        self.merge_string(flag::SEARCH_BEFORE_DATE, &mut s.before_date);
        self.merge_string(flag::LAST_UPDATED_AFTER, &mut s.last_updated_after);
        self.merge_string(flag::LAST_UPDATED_BEFORE, &mut s.last_updated_before);

        let o = &mut config.output;
        self.merge_bool(flag::STREAM, &mut o.stream);
        self.merge_bool(flag::RETURN_IMAGES, &mut o.return_images);
        self.merge_bool(flag::RETURN_RELATED, &mut o.return_related);
        self.merge_bool(flag::JSON, &mut o.json);
        self.merge_strings(flag::IMAGE_DOMAINS, &mut o.image_domains);
        self.merge_strings(flag::IMAGE_FORMATS, &mut o.image_formats);
        self.merge_string(flag::RESPONSE_FORMAT_JSON_SCHEMA, &mut o.response_format_json_schema);
        self.merge_string(flag::RESPONSE_FORMAT_REGEX, &mut o.response_format_regex);
        self.merge_string(flag::REASONING_EFFORT, &mut o.reasoning_effort);

        let a = &mut config.api;
        if self.flags.is_provided(flag::API_KEY) {
            if let Some(key) = self.flags.string(flag::API_KEY) {
                tracing::debug!("Flag --{} overrides api.key", flag::API_KEY);
                a.key = key;
            }
        }
        self.merge_string(flag::BASE_URL, &mut a.base_url);
        if self.flags.is_provided(flag::TIMEOUT) {
            if let Some(timeout) = self.flags.duration(flag::TIMEOUT) {
                a.timeout = humantime::format_duration(timeout).to_string();
                tracing::debug!("Flag --{} sets timeout to {}", flag::TIMEOUT, a.timeout);
            }
        }
    }

    fn merge_string(&self, name: &str, dst: &mut String) {
        if self.flags.is_provided(name) {
            if let Some(value) = self.flags.string(name) {
                tracing::debug!("Flag --{} = {:?}", name, value);
                *dst = value;
            }
        }
    }

    fn merge_float(&self, name: &str, dst: &mut f64) {
        if self.flags.is_provided(name) {
            if let Some(value) = self.flags.float(name) {
                tracing::debug!("Flag --{} = {}", name, value);
                *dst = value;
            }
        }
    }

    fn merge_int(&self, name: &str, dst: &mut i64) {
        if self.flags.is_provided(name) {
            if let Some(value) = self.flags.int(name) {
                tracing::debug!("Flag --{} = {}", name, value);
                *dst = value;
            }
        }
    }

    fn merge_bool(&self, name: &str, dst: &mut bool) {
        if self.flags.is_provided(name) {
            if let Some(value) = self.flags.boolean(name) {
                tracing::debug!("Flag --{} = {}", name, value);
                *dst = value;
            }
        }
    }

    fn merge_strings(&self, name: &str, dst: &mut Vec<String>) {
        if self.flags.is_provided(name) {
            if let Some(values) = self.flags.strings(name) {
                tracing::debug!("Flag --{} = {:?}", name, values);
                *dst = values;
            }
        }
    }
}

/// Parse a command-line duration such as `30s`, `1m 30s` or a bare number of
/// seconds.
pub fn parse_duration(input: &str) -> Result<Duration, humantime::DurationError> {
    let trimmed = input.trim();
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(trimmed)
}
