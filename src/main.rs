//! pplx: query AI search models from the command line
//!
//! Configuration is resolved from built-in defaults, a YAML config file, a
//! named profile and command-line flags, then validated before use.

use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    cli::run()
}
