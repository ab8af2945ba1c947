//! Config file discovery, loading and saving

use figment::providers::Serialized;
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::model::ConfigData;

pub const TOOL_NAME: &str = "pplx";

/// Accepted file names, in lookup order within each directory.
pub const CONFIG_FILE_NAMES: [&str; 4] = ["pplx.yaml", "config.yaml", "pplx.yml", "config.yml"];

/// Directories searched for a config file, highest priority first.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(dir) = user_config_dir() {
        dirs.push(dir);
    }
    dirs.push(PathBuf::from("/etc").join(TOOL_NAME));
    dirs
}

/// `$HOME/.config/pplx`
pub fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join(TOOL_NAME))
}

/// Where `config init` and the profile commands write when no file exists yet.
pub fn default_config_path() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join("config.yaml"))
}

/// Layers a config file over pre-populated data.
///
/// Keys present in the file win over the pre-populated values, including keys
/// set to a zero value. Keys absent from the file keep the pre-populated value.
pub struct Loader {
    data: ConfigData,
    search_dirs: Vec<PathBuf>,
    source: Option<PathBuf>,
}

impl Loader {
    /// Loader seeded with the built-in defaults and the standard search path.
    pub fn new() -> Self {
        Self::with_data(ConfigData::builtin())
    }

    pub fn with_data(data: ConfigData) -> Self {
        Self { data, search_dirs: default_search_dirs(), source: None }
    }

    /// Replace the directories searched by [`Loader::load`].
    pub fn search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Search the standard directories and layer the first file found.
    ///
    /// Finding no file is not an error; the pre-populated data is kept.
    pub fn load(&mut self) -> Result<(), ConfigError> {
        match self.find_config_file() {
            Ok(path) => self.layer_file(&path),
            Err(ConfigError::NoConfigFound { .. }) => {
                tracing::debug!("No config file found, using built-in defaults");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Layer an explicitly named file. The file must exist.
    pub fn load_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                what: format!("config file {}", path.display()),
            });
        }
        self.layer_file(path)
    }

    /// First existing candidate in search order.
    pub fn find_config_file(&self) -> Result<PathBuf, ConfigError> {
        let candidates = self.candidates();
        for candidate in &candidates {
            if candidate.is_file() {
                tracing::debug!("Found config file {}", candidate.display());
                return Ok(candidate.clone());
            }
        }
        Err(ConfigError::NoConfigFound { searched: candidates })
    }

    pub fn data(&self) -> &ConfigData {
        &self.data
    }

    pub fn into_data(self) -> ConfigData {
        self.data
    }

    /// File the current data was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn candidates(&self) -> Vec<PathBuf> {
        self.search_dirs
            .iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .collect()
    }

    fn layer_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let mut document = read_document(path)?;
        drop_null_entries(&mut document);
        if !document.is_null() {
            self.data = Figment::from(Serialized::defaults(&self.data))
                .merge(Serialized::defaults(document))
                .extract()
                .map_err(|e| ConfigError::Deserialization {
                    path: path.to_path_buf(),
                    message: describe_figment_error(&e),
                })?;
        }
        tracing::debug!("Loaded config from {}", path.display());
        self.source = Some(path.to_path_buf());
        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Read and deserialize exactly one file.
///
/// An empty document yields an all-zero [`ConfigData`].
pub fn load_from(path: &Path) -> Result<ConfigData, ConfigError> {
    let document = read_document(path)?;
    if document.is_null() {
        return Ok(ConfigData::default());
    }
    serde_yaml::from_value(document).map_err(|e| ConfigError::Deserialization {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write `config` as YAML, creating parent directories.
///
/// The file may hold an API key, so on Unix it is created owner-only.
pub fn save(config: &ConfigData, path: &Path) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::Serialization(e.to_string()))?;
    write_private(path, &yaml)
}

pub(crate) fn write_private(path: &Path, content: &str) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, content).map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_err)?;
    }

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

fn read_document(path: &Path) -> Result<serde_yaml::Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Deserialization {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if is_blank_document(&content) {
        return Ok(serde_yaml::Value::Null);
    }

    serde_yaml::from_str(&content).map_err(|e| ConfigError::Deserialization {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Remove mapping entries whose value is null, at any depth. A key such as
/// `search:` with every field commented out sets nothing, and merging the
/// null would replace the section underneath it.
fn drop_null_entries(value: &mut serde_yaml::Value) {
    if let serde_yaml::Value::Mapping(map) = value {
        map.retain(|_, v| !v.is_null());
        for (_, v) in map.iter_mut() {
            drop_null_entries(v);
        }
    }
}

/// The figment error without its profile name and provider metadata, which
/// describe this crate's internals rather than the user's file.
fn describe_figment_error(error: &figment::Error) -> String {
    if error.path.is_empty() {
        error.kind.to_string()
    } else {
        format!("{} for key '{}'", error.kind, error.path.join("."))
    }
}

fn is_blank_document(content: &str) -> bool {
    content.lines().map(str::trim).all(|line| line.is_empty() || line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader_in(dirs: &[&Path]) -> Loader {
        Loader::new().search_dirs(dirs.iter().map(|d| d.to_path_buf()).collect())
    }

    #[test]
    fn test_load_from_reads_sections() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pplx.yaml");
        fs::write(
            &path,
            "defaults:\n  model: sonar-pro\n  temperature: 0.4\nsearch:\n  recency: week\n  domains: [a.com, b.org]\napi:\n  timeout: 30s\n",
        )
        .expect("write");

        let cfg = load_from(&path).expect("config");
        assert_eq!(cfg.defaults.model, "sonar-pro");
        assert_eq!(cfg.defaults.temperature, 0.4);
        assert_eq!(cfg.search.recency, "week");
        assert_eq!(cfg.search.domains, vec!["a.com", "b.org"]);
        assert_eq!(cfg.api.timeout, "30s");
        assert!(cfg.api.base_url.is_empty(), "load_from must not add built-in defaults");
    }

    #[test]
    fn test_load_from_empty_file_is_all_zero() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pplx.yaml");
        fs::write(&path, "# nothing configured yet\n\n").expect("write");

        let cfg = load_from(&path).expect("empty document parses");
        assert_eq!(cfg, ConfigData::default());
    }

    #[test]
    fn test_load_from_malformed_yaml_fails() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pplx.yaml");
        fs::write(&path, "search:\n  domains: [a.com, b.org\n").expect("write");

        let err = load_from(&path).expect_err("unterminated sequence");
        assert!(matches!(err, ConfigError::Deserialization { .. }), "got {:?}", err);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let tmp = TempDir::new().expect("tmp");
        let err = load_from(&tmp.path().join("absent.yaml")).expect_err("missing file");
        assert!(matches!(err, ConfigError::Deserialization { .. }), "got {:?}", err);
    }

    #[test]
    fn test_load_without_any_file_keeps_defaults() {
        let tmp = TempDir::new().expect("tmp");
        let mut loader = loader_in(&[tmp.path()]);
        loader.load().expect("absence is not an error");
        assert_eq!(loader.data(), &ConfigData::builtin());
        assert!(loader.source().is_none());
    }

    #[test]
    fn test_load_layers_file_over_defaults() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("config.yml"), "search:\n  recency: week\n").expect("write");

        let mut loader = loader_in(&[tmp.path()]);
        loader.load().expect("load");
        let cfg = loader.data();
        assert_eq!(cfg.search.recency, "week");
        assert_eq!(cfg.defaults.model, "sonar", "untouched defaults survive");
        assert_eq!(cfg.api.timeout, "2m");
    }

    #[test]
    fn test_explicit_zero_in_file_overrides_default() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pplx.yaml");
        fs::write(&path, "defaults:\n  temperature: 0\n  model: \"\"\n").expect("write");

        let mut seeded = ConfigData::builtin();
        seeded.defaults.temperature = 0.9;
        let mut loader = Loader::with_data(seeded);
        loader.load_path(&path).expect("load");

        assert_eq!(loader.data().defaults.temperature, 0.0);
        assert_eq!(loader.data().defaults.model, "");
    }

    #[test]
    fn test_load_path_ignores_empty_sections() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pplx.yaml");
        fs::write(&path, "search:\n  # recency: week\ndefaults:\n  model: x\noutput:\n").expect("write");

        let mut seeded = ConfigData::builtin();
        seeded.search.recency = "day".to_string();
        let mut loader = Loader::with_data(seeded.clone());
        loader.load_path(&path).expect("empty sections load");

        assert_eq!(loader.data().defaults.model, "x");
        assert_eq!(loader.data().search, seeded.search);
        assert_eq!(loader.data().output, seeded.output);
        assert_eq!(load_from(&path).expect("load_from").defaults.model, "x");
    }

    #[test]
    fn test_type_error_names_the_key_only() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("pplx.yaml");
        fs::write(&path, "search: week\n").expect("write");

        let err = Loader::new().load_path(&path).expect_err("scalar section");
        let ConfigError::Deserialization { message, .. } = err else {
            panic!("expected a deserialization error, got {:?}", err);
        };
        assert!(message.contains("for key 'search'"), "got {}", message);
        assert!(!message.contains("default."), "got {}", message);
        assert!(!message.contains("loader.rs"), "got {}", message);
    }

    #[test]
    fn test_find_config_file_prefers_search_order() {
        let first = TempDir::new().expect("tmp");
        let second = TempDir::new().expect("tmp");
        fs::write(first.path().join("config.yaml"), "").expect("write");
        fs::write(first.path().join("pplx.yml"), "").expect("write");
        fs::write(second.path().join("pplx.yaml"), "").expect("write");

        let loader = loader_in(&[first.path(), second.path()]);
        let found = loader.find_config_file().expect("found");
        assert_eq!(found, first.path().join("config.yaml"));
    }

    #[test]
    fn test_find_config_file_reports_no_config() {
        let tmp = TempDir::new().expect("tmp");
        let err = loader_in(&[tmp.path()]).find_config_file().expect_err("nothing there");
        match err {
            ConfigError::NoConfigFound { searched } => assert_eq!(searched.len(), 4),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_path_missing_file_is_not_found() {
        let tmp = TempDir::new().expect("tmp");
        let mut loader = Loader::new();
        let err = loader.load_path(&tmp.path().join("nope.yaml")).expect_err("missing");
        assert!(matches!(err, ConfigError::NotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn test_load_surfaces_malformed_discovered_file() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("pplx.yaml"), "defaults: [unclosed\n").expect("write");
        let err = loader_in(&[tmp.path()]).load().expect_err("malformed");
        assert!(matches!(err, ConfigError::Deserialization { .. }), "got {:?}", err);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("nested").join("config.yaml");
        let mut cfg = ConfigData::builtin();
        cfg.search.domains = vec!["docs.rs".to_string()];
        cfg.output.stream = true;

        save(&cfg, &path).expect("save");
        assert_eq!(load_from(&path).expect("reload"), cfg);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).expect("meta").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
