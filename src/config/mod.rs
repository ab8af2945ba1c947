//! Configuration loading, profiles, merging and validation
//!
//! Sources are combined with the precedence CLI flag > profile > config file >
//! built-in default. See [`resolve`] for the full pipeline.

pub mod env;
pub mod error;
pub mod loader;
pub mod merge;
pub mod model;
pub mod profile;
pub mod resolve;
pub mod validate;

pub use env::expand_env;
pub use error::{ConfigError, ProfileError};
pub use loader::{load_from, save, Loader};
pub use merge::{flag, FlagSet, FlagSource, Merger};
pub use model::{ConfigData, NamedProfile, Profile, DEFAULT_PROFILE};
pub use profile::{ProfileManager, ProfileRef};
pub use resolve::{resolve, resolve_validated, ResolveOptions, Resolution};
pub use validate::{ValidationError, ValidationErrors, Validator};
