//! pplx: query AI search models from the command line
//!
//! The library holds the configuration engine: loading YAML config files,
//! expanding environment variables, applying named profiles and command-line
//! flags, and validating the result before a request is built from it.

pub mod config;
