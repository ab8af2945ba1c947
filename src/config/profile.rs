//! Named profile management and profile overlay
//!
//! Profiles are partial overrides of the root `defaults`, `search` and `output`
//! sections. The name `default` is reserved for the implicit profile formed by
//! the root sections themselves; it is never stored.

use super::error::ProfileError;
use super::model::{ConfigData, Defaults, NamedProfile, Output, Profile, Search, DEFAULT_PROFILE};

const DEFAULT_PROFILE_DESCRIPTION: &str = "Settings from the root configuration";

/// Borrowed view of a profile, stored or synthesized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileRef<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub defaults: &'a Defaults,
    pub search: &'a Search,
    pub output: &'a Output,
}

impl ProfileRef<'_> {
    pub fn to_named(&self) -> NamedProfile {
        NamedProfile {
            name: self.name.to_string(),
            description: self.description.to_string(),
            defaults: self.defaults.clone(),
            search: self.search.clone(),
            output: self.output.clone(),
        }
    }
}

/// CRUD over the live profile map of a [`ConfigData`].
pub struct ProfileManager<'a> {
    config: &'a mut ConfigData,
}

impl<'a> ProfileManager<'a> {
    pub fn new(config: &'a mut ConfigData) -> Self {
        Self { config }
    }

    pub fn create_profile(&mut self, name: &str, description: &str) -> Result<(), ProfileError> {
        check_writable_name(name)?;
        if self.config.profiles.contains_key(name) {
            return Err(ProfileError::AlreadyExists(name.to_string()));
        }
        self.config.profiles.insert(
            name.to_string(),
            Profile { description: description.to_string(), ..Profile::default() },
        );
        tracing::debug!("Created profile {}", name);
        Ok(())
    }

    /// Look up a profile. An empty name or `default` yields the root sections.
    pub fn load_profile(&self, name: &str) -> Result<ProfileRef<'_>, ProfileError> {
        if is_default(name) {
            return Ok(ProfileRef {
                name: DEFAULT_PROFILE,
                description: DEFAULT_PROFILE_DESCRIPTION,
                defaults: &self.config.defaults,
                search: &self.config.search,
                output: &self.config.output,
            });
        }

        let (name, profile) = self
            .config
            .profiles
            .get_key_value(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        Ok(ProfileRef {
            name,
            description: &profile.description,
            defaults: &profile.defaults,
            search: &profile.search,
            output: &profile.output,
        })
    }

    /// Replace an existing profile.
    pub fn update_profile(&mut self, name: &str, profile: Profile) -> Result<(), ProfileError> {
        check_writable_name(name)?;
        let slot = self
            .config
            .profiles
            .get_mut(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        *slot = profile;
        Ok(())
    }

    /// Remove a profile. Removing the active profile makes `default` active.
    pub fn delete_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        if name == DEFAULT_PROFILE {
            return Err(ProfileError::Reserved(name.to_string()));
        }
        if self.config.profiles.remove(name).is_none() {
            return Err(ProfileError::NotFound(name.to_string()));
        }
        if self.config.active_profile == name {
            tracing::debug!("Deleted active profile {}, falling back to default", name);
            self.config.active_profile = DEFAULT_PROFILE.to_string();
        }
        Ok(())
    }

    pub fn set_active_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        if name != DEFAULT_PROFILE && !self.config.profiles.contains_key(name) {
            return Err(ProfileError::NotFound(name.to_string()));
        }
        self.config.active_profile = name.to_string();
        Ok(())
    }

    /// `default` first, then stored profiles in name order.
    pub fn list_profiles(&self) -> Vec<&str> {
        std::iter::once(DEFAULT_PROFILE)
            .chain(self.config.profiles.keys().map(String::as_str))
            .collect()
    }

    pub fn active_profile(&self) -> &str {
        self.config.effective_profile()
    }

    /// Root configuration with the named profile laid over it.
    ///
    /// Strings, numbers and lists from the profile win when non-empty/non-zero.
    /// Booleans are OR-ed: a profile can switch a feature on but never off.
    pub fn merge_profile(&self, name: &str) -> Result<ConfigData, ProfileError> {
        let mut merged = self.config.clone();
        if is_default(name) {
            return Ok(merged);
        }

        let profile =
            self.config.profiles.get(name).ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        overlay_defaults(&mut merged.defaults, &profile.defaults);
        overlay_search(&mut merged.search, &profile.search);
        overlay_output(&mut merged.output, &profile.output);
        tracing::debug!("Merged profile {} over root configuration", name);
        Ok(merged)
    }

    /// Detached copy of a stored profile, or of the implicit default.
    pub fn export_profile(&self, name: &str) -> Result<NamedProfile, ProfileError> {
        Ok(self.load_profile(name)?.to_named())
    }

    /// Store an exported profile. Existing names need `overwrite`, which
    /// replaces the stored profile entirely.
    pub fn import_profile(&mut self, export: NamedProfile, overwrite: bool) -> Result<(), ProfileError> {
        let (name, profile) = export.into_parts();
        check_writable_name(&name)?;
        if !overwrite && self.config.profiles.contains_key(&name) {
            return Err(ProfileError::AlreadyExists(name));
        }
        tracing::debug!("Imported profile {}", name);
        self.config.profiles.insert(name, profile);
        Ok(())
    }
}

fn is_default(name: &str) -> bool {
    name.is_empty() || name == DEFAULT_PROFILE
}

fn check_writable_name(name: &str) -> Result<(), ProfileError> {
    if name.is_empty() {
        return Err(ProfileError::EmptyName);
    }
    if name == DEFAULT_PROFILE {
        return Err(ProfileError::Reserved(name.to_string()));
    }
    Ok(())
}

fn set_str(dst: &mut String, src: &str) {
    if !src.is_empty() {
        *dst = src.to_string();
    }
}

fn set_f64(dst: &mut f64, src: f64) {
    if src != 0.0 {
        *dst = src;
    }
}

fn set_i64(dst: &mut i64, src: i64) {
    if src != 0 {
        *dst = src;
    }
}

fn set_list(dst: &mut Vec<String>, src: &[String]) {
    if !src.is_empty() {
        *dst = src.to_vec();
    }
}

fn overlay_defaults(dst: &mut Defaults, src: &Defaults) {
    set_str(&mut dst.model, &src.model);
    set_f64(&mut dst.temperature, src.temperature);
    set_i64(&mut dst.max_tokens, src.max_tokens);
    set_i64(&mut dst.top_k, src.top_k);
    set_f64(&mut dst.top_p, src.top_p);
    set_f64(&mut dst.frequency_penalty, src.frequency_penalty);
    set_f64(&mut dst.presence_penalty, src.presence_penalty);
}

fn overlay_search(dst: &mut Search, src: &Search) {
    set_list(&mut dst.domains, &src.domains);
    set_str(&mut dst.recency, &src.recency);
    set_str(&mut dst.mode, &src.mode);
    set_str(&mut dst.context_size, &src.context_size);
    set_f64(&mut dst.location_lat, src.location_lat);
    set_f64(&mut dst.location_lon, src.location_lon);
    set_str(&mut dst.location_country, &src.location_country);
    set_str(&mut dst.after_date, &src.after_date);
    set_str(&mut dst.before_date, &src.before_date);
    set_str(&mut dst.last_updated_after, &src.last_updated_after);
    set_str(&mut dst.last_updated_before, &src.last_updated_before);
}

fn overlay_output(dst: &mut Output, src: &Output) {
    dst.stream = src.stream || dst.stream;
    dst.return_images = src.return_images || dst.return_images;
    dst.return_related = src.return_related || dst.return_related;
    dst.json = src.json || dst.json;
    set_list(&mut dst.image_domains, &src.image_domains);
    set_list(&mut dst.image_formats, &src.image_formats);
    set_str(&mut dst.response_format_json_schema, &src.response_format_json_schema);
    set_str(&mut dst.response_format_regex, &src.response_format_regex);
    set_str(&mut dst.reasoning_effort, &src.reasoning_effort);
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn base_config() -> ConfigData {
        let mut cfg = ConfigData::builtin();
        cfg.defaults.temperature = 0.7;
        cfg.defaults.max_tokens = 1024;
        cfg.search.recency = "month".to_string();
        cfg.search.domains = vec!["base.org".to_string()];
        cfg.output.stream = true;
        cfg
    }

    #[test]
    fn test_create_profile_rejects_bad_names() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        assert_eq!(pm.create_profile("", "x"), Err(ProfileError::EmptyName));
        assert_eq!(
            pm.create_profile("default", "x"),
            Err(ProfileError::Reserved("default".to_string()))
        );
        pm.create_profile("work", "office").expect("create");
        assert_eq!(
            pm.create_profile("work", "again"),
            Err(ProfileError::AlreadyExists("work".to_string()))
        );
        assert_eq!(cfg.profiles["work"].description, "office");
    }

    #[test]
    fn test_load_default_profile_views_root_sections() {
        let mut cfg = base_config();
        let pm = ProfileManager::new(&mut cfg);
        for name in ["", "default"] {
            let view = pm.load_profile(name).expect("default exists");
            assert_eq!(view.name, "default");
            assert_eq!(view.search.recency, "month");
            assert_eq!(view.defaults.max_tokens, 1024);
        }
        assert_eq!(pm.load_profile("ghost"), Err(ProfileError::NotFound("ghost".to_string())));
    }

    #[test]
    fn test_update_profile_requires_existing_non_default() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        let replacement = Profile { description: "new".to_string(), ..Profile::default() };
        assert_eq!(
            pm.update_profile("default", replacement.clone()),
            Err(ProfileError::Reserved("default".to_string()))
        );
        assert_eq!(
            pm.update_profile("missing", replacement.clone()),
            Err(ProfileError::NotFound("missing".to_string()))
        );
        pm.create_profile("work", "old").expect("create");
        pm.update_profile("work", replacement).expect("update");
        assert_eq!(pm.load_profile("work").expect("load").description, "new");
    }

    #[test]
    fn test_delete_active_profile_resets_to_default() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        pm.create_profile("work", "").expect("create");
        pm.set_active_profile("work").expect("activate");
        pm.delete_profile("work").expect("delete");
        assert_eq!(pm.active_profile(), "default");
        assert_eq!(cfg.active_profile, "default");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn test_delete_inactive_profile_keeps_active() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        pm.create_profile("a", "").expect("create");
        pm.create_profile("b", "").expect("create");
        pm.set_active_profile("a").expect("activate");
        pm.delete_profile("b").expect("delete");
        assert_eq!(pm.active_profile(), "a");
    }

    #[test]
    fn test_delete_default_and_missing_fail() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        assert_eq!(pm.delete_profile("default"), Err(ProfileError::Reserved("default".to_string())));
        assert_eq!(pm.delete_profile("nope"), Err(ProfileError::NotFound("nope".to_string())));
    }

    #[test]
    fn test_set_active_profile_validates_name() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        assert_eq!(pm.set_active_profile("ghost"), Err(ProfileError::NotFound("ghost".to_string())));
        pm.set_active_profile("default").expect("default is always valid");
        pm.create_profile("work", "").expect("create");
        pm.set_active_profile("work").expect("activate");
        assert_eq!(pm.list_profiles(), vec!["default", "work"]);
    }

    #[test]
    fn test_merge_profile_overrides_non_zero_fields() {
        let mut cfg = base_config();
        cfg.profiles.insert(
            "precise".to_string(),
            Profile {
                defaults: Defaults {
                    model: "sonar-reasoning".to_string(),
                    temperature: 0.1,
                    ..Defaults::default()
                },
                search: Search { mode: "academic".to_string(), ..Search::default() },
                ..Profile::default()
            },
        );

        let merged = ProfileManager::new(&mut cfg).merge_profile("precise").expect("merge");
        assert_eq!(merged.defaults.model, "sonar-reasoning");
        assert_eq!(merged.defaults.temperature, 0.1);
        assert_eq!(merged.defaults.max_tokens, 1024, "zero in profile keeps base value");
        assert_eq!(merged.search.mode, "academic");
        assert_eq!(merged.search.recency, "month");
        assert_eq!(merged.search.domains, vec!["base.org"]);
        assert_eq!(merged.api, cfg.api);
    }

    #[test]
    fn test_merge_empty_profile_is_identity_for_sections() {
        let mut cfg = base_config();
        cfg.profiles.insert("blank".to_string(), Profile::default());
        let merged = ProfileManager::new(&mut cfg).merge_profile("blank").expect("merge");
        assert_eq!(merged.defaults, cfg.defaults);
        assert_eq!(merged.search, cfg.search);
        assert_eq!(merged.output, cfg.output);
    }

    #[test]
    fn test_merge_profile_booleans_are_or() {
        let mut cfg = base_config();
        cfg.profiles.insert(
            "images".to_string(),
            Profile {
                output: Output { stream: false, return_images: true, ..Output::default() },
                ..Profile::default()
            },
        );
        let merged = ProfileManager::new(&mut cfg).merge_profile("images").expect("merge");
        assert!(merged.output.stream, "profile false must not switch base true off");
        assert!(merged.output.return_images);
        assert!(!merged.output.return_related);
    }

    #[test]
    fn test_merge_default_and_unknown() {
        let mut cfg = base_config();
        let pm = ProfileManager::new(&mut cfg);
        let merged = pm.merge_profile("default").expect("default");
        assert_eq!(merged.defaults.temperature, 0.7);
        assert_eq!(pm.merge_profile("ghost"), Err(ProfileError::NotFound("ghost".to_string())));
    }

    #[test]
    fn test_export_is_detached_copy() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        pm.create_profile("work", "office").expect("create");
        let mut exported = pm.export_profile("work").expect("export");
        exported.description = "changed".to_string();
        assert_eq!(pm.load_profile("work").expect("load").description, "office");
        assert_eq!(exported.name, "work");
    }

    #[test]
    fn test_import_requires_overwrite_for_existing() {
        let mut cfg = ConfigData::default();
        let mut pm = ProfileManager::new(&mut cfg);
        pm.create_profile("work", "old").expect("create");

        let mut incoming = NamedProfile::new(
            "work",
            Profile {
                description: "new".to_string(),
                search: Search { recency: "day".to_string(), ..Search::default() },
                ..Profile::default()
            },
        );
        assert_eq!(
            pm.import_profile(incoming.clone(), false),
            Err(ProfileError::AlreadyExists("work".to_string()))
        );

        pm.import_profile(incoming.clone(), true).expect("overwrite");
        let stored = pm.load_profile("work").expect("load");
        assert_eq!(stored.description, "new");
        assert_eq!(stored.search.recency, "day");

        incoming.name = "default".to_string();
        assert_eq!(
            pm.import_profile(incoming.clone(), true),
            Err(ProfileError::Reserved("default".to_string()))
        );
        incoming.name = String::new();
        assert_eq!(pm.import_profile(incoming, true), Err(ProfileError::EmptyName));
    }
}
