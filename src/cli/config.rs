//! Config command implementation

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Subcommand, ValueEnum};
use console::style;
use pplx::config::loader::{default_config_path, Loader};
use pplx::config::{expand_env, load_from, resolve, save, ConfigData, Merger, Validator};
use std::path::PathBuf;

use super::utils::{mask_secret, target_config_path};
use super::GlobalArgs;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration after files, profile and flags are applied
    Show(ShowArgs),

    /// Check the config file and report every problem at once
    Validate,

    /// Write a starter config file with the built-in defaults
    Init(InitArgs),

    /// Write configuration flags into the config file
    Save(SaveArgs),

    /// Print the config file that would be used
    Path,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    Yaml,
    Json,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,

    /// Print the API key instead of masking it
    #[arg(long)]
    pub show_secrets: bool,
}

#[derive(Args)]
pub struct InitArgs {
    /// Where to write (defaults to ~/.config/pplx/config.yaml)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SaveArgs {
    /// Where to write (defaults to the config file in use)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

pub fn run(cmd: ConfigCommand, global: &GlobalArgs, matches: &ArgMatches) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => show(args, global, matches),
        ConfigCommand::Validate => validate(global),
        ConfigCommand::Init(args) => init(args),
        ConfigCommand::Save(args) => save_flags(args, global, matches),
        ConfigCommand::Path => path(),
    }
}

fn show(args: ShowArgs, global: &GlobalArgs, matches: &ArgMatches) -> Result<()> {
    let resolution = resolve(&global.resolve_options(), matches)?;
    let mut config = resolution.config;

    if let Err(errors) = Validator::new().validate(&config) {
        eprintln!("{} {}", style("warning:").yellow().bold(), errors);
    }
    if !args.show_secrets {
        config.api.key = mask_secret(&config.api.key);
    }

    let rendered = match args.format {
        Format::Yaml => serde_yaml::to_string(&config).context("Failed to render YAML")?,
        Format::Json => serde_json::to_string_pretty(&config).context("Failed to render JSON")?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn validate(global: &GlobalArgs) -> Result<()> {
    let mut loader = Loader::with_data(ConfigData::default());
    let path = match &global.config_file {
        Some(path) => path.clone(),
        None => loader.find_config_file()?,
    };
    loader.load_path(&path)?;

    let mut config = loader.into_data();
    expand_env(&mut config);

    Validator::new()
        .validate(&config)
        .map_err(|errors| anyhow::Error::new(errors).context(format!("{} is invalid", path.display())))?;

    println!("{} {} is valid", style("✓").green(), path.display());
    Ok(())
}

fn init(args: InitArgs) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => default_config_path().context("Cannot determine the config location: HOME is not set")?,
    };
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    save(&ConfigData::builtin(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Lay the given flags over the stored file (or the built-in defaults) and
/// write the result. Environment references are stored unexpanded.
fn save_flags(args: SaveArgs, global: &GlobalArgs, matches: &ArgMatches) -> Result<()> {
    let source = target_config_path(global)?;
    let mut config = if source.exists() { load_from(&source)? } else { ConfigData::builtin() };
    Merger::new(matches).merge_with_flags(&mut config);

    Validator::new()
        .validate(&config)
        .map_err(|errors| anyhow::Error::new(errors).context("Refusing to save an invalid configuration"))?;

    let target = args.path.unwrap_or(source);
    save(&config, &target)?;
    println!("Saved {}", target.display());
    Ok(())
}

fn path() -> Result<()> {
    let path = Loader::new().find_config_file()?;
    println!("{}", path.display());
    Ok(())
}
