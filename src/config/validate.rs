//! Configuration validation
//!
//! Every rule is evaluated on every run and all violations are reported
//! together, so a user can fix a config in one pass.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use super::merge::parse_duration;
use super::model::{Api, ConfigData, Defaults, Output, Search, DEFAULT_PROFILE};

pub const RECENCY_VALUES: [&str; 5] = ["hour", "day", "week", "month", "year"];
pub const SEARCH_MODE_VALUES: [&str; 2] = ["web", "academic"];
pub const CONTEXT_SIZE_VALUES: [&str; 3] = ["low", "medium", "high"];
pub const REASONING_EFFORT_VALUES: [&str; 3] = ["low", "medium", "high"];

// Shape only; calendar validity is not checked.
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid date regex"));
static PROFILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid profile name regex"));

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path, e.g. `profiles.work.search.recency`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All violations found by one [`Validator::validate`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any violation concerns `field`.
    pub fn contains_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration has {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&mut self, config: &ConfigData) -> Result<(), ValidationErrors> {
        self.errors.clear();

        self.validate_defaults("defaults", &config.defaults);
        self.validate_search("search", &config.search);
        self.validate_output("output", &config.output);
        self.validate_api("api", &config.api);

        for (name, profile) in &config.profiles {
            let prefix = format!("profiles.{}", name);
            if name == DEFAULT_PROFILE {
                self.add(&prefix, "profile name 'default' is reserved");
            } else if !PROFILE_NAME_RE.is_match(name) {
                self.add(
                    &prefix,
                    format!(
                        "invalid profile name '{}': use letters, digits, '_' or '-'",
                        name
                    ),
                );
            }
            self.validate_defaults(&format!("{}.defaults", prefix), &profile.defaults);
            self.validate_search(&format!("{}.search", prefix), &profile.search);
            self.validate_output(&format!("{}.output", prefix), &profile.output);
        }

        let active = &config.active_profile;
        if !active.is_empty() && active != DEFAULT_PROFILE && !config.profiles.contains_key(active) {
            self.add("active_profile", format!("profile '{}' does not exist", active));
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { errors: self.errors.clone() })
        }
    }

    /// Violations from the most recent run.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError { field: field.to_string(), message: message.into() });
    }

    fn check_range(&mut self, field: String, value: f64, min: f64, max: f64) {
        if !(min..=max).contains(&value) {
            self.add(&field, format!("must be between {} and {}, got {}", min, max, value));
        }
    }

    fn check_non_negative(&mut self, field: String, value: i64) {
        if value < 0 {
            self.add(&field, format!("must be non-negative, got {}", value));
        }
    }

    fn check_one_of(&mut self, field: String, value: &str, allowed: &[&str]) {
        if !value.is_empty() && !allowed.contains(&value) {
            self.add(
                &field,
                format!("invalid value '{}', must be one of: {}", value, allowed.join(", ")),
            );
        }
    }

    fn check_date(&mut self, field: String, value: &str) {
        if !value.is_empty() && !DATE_RE.is_match(value) {
            self.add(&field, format!("invalid date '{}', expected MM/DD/YYYY", value));
        }
    }

    fn validate_defaults(&mut self, prefix: &str, d: &Defaults) {
        self.check_range(format!("{}.temperature", prefix), d.temperature, 0.0, 2.0);
        self.check_non_negative(format!("{}.max_tokens", prefix), d.max_tokens);
        self.check_non_negative(format!("{}.top_k", prefix), d.top_k);
        self.check_range(format!("{}.top_p", prefix), d.top_p, 0.0, 1.0);
        self.check_range(format!("{}.frequency_penalty", prefix), d.frequency_penalty, 0.0, 2.0);
        self.check_range(format!("{}.presence_penalty", prefix), d.presence_penalty, 0.0, 2.0);
    }

    fn validate_search(&mut self, prefix: &str, s: &Search) {
        self.check_one_of(format!("{}.recency", prefix), &s.recency, &RECENCY_VALUES);
        self.check_one_of(format!("{}.mode", prefix), &s.mode, &SEARCH_MODE_VALUES);
        self.check_one_of(format!("{}.context_size", prefix), &s.context_size, &CONTEXT_SIZE_VALUES);
        self.check_range(format!("{}.location_lat", prefix), s.location_lat, -90.0, 90.0);
        self.check_range(format!("{}.location_lon", prefix), s.location_lon, -180.0, 180.0);
        self.check_date(format!("{}.after_date", prefix), &s.after_date);
        self.check_date(format!("{}.before_date", prefix), &s.before_date);
        self.check_date(format!("{}.last_updated_after", prefix), &s.last_updated_after);
        self.check_date(format!("{}.last_updated_before", prefix), &s.last_updated_before);
    }

    fn validate_output(&mut self, prefix: &str, o: &Output) {
        self.check_one_of(
            format!("{}.reasoning_effort", prefix),
            &o.reasoning_effort,
            &REASONING_EFFORT_VALUES,
        );
    }

    fn validate_api(&mut self, prefix: &str, a: &Api) {
        // Prefix check only; anything after the scheme is accepted.
        if !a.base_url.is_empty()
            && !(a.base_url.starts_with("http://") || a.base_url.starts_with("https://"))
        {
            self.add(
                &format!("{}.base_url", prefix),
                format!("'{}' must start with http:// or https://", a.base_url),
            );
        }
        if !a.timeout.is_empty() && parse_duration(&a.timeout).is_err() {
            self.add(
                &format!("{}.timeout", prefix),
                format!("invalid duration '{}', expected e.g. 30s or 2m", a.timeout),
            );
        }
    }
}
