//! Command-line interface for pplx
//!
//! The root command resolves configuration for a query. `config` and
//! `profile` manage the files that feed the resolution.

use anyhow::Result;
use clap::{ArgMatches, Args, Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use pplx::config::merge::bind_flags;
use pplx::config::ResolveOptions;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod completions;
mod config;
mod profile;
mod query;
mod utils;

/// Query AI search models from the command line
#[derive(Parser)]
#[command(name = "pplx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    query: query::QueryArgs,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Path to config file (skips discovery)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Profile to apply instead of the configured active profile
    #[arg(short = 'p', long, value_name = "NAME", global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            config_path: self.config_file.clone(),
            profile: self.profile.clone(),
            search_dirs: None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect, validate and create configuration files
    #[command(subcommand)]
    Config(config::ConfigCommand),

    /// Manage named profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommand),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Full command tree, including the configuration flags.
pub fn command() -> Command {
    bind_flags(Cli::command())
        .mut_subcommand("config", |cmd| {
            cmd.mut_subcommand("show", bind_flags).mut_subcommand("save", bind_flags)
        })
        .mut_subcommand("profile", |cmd| cmd.mut_subcommand("create", bind_flags))
}

pub fn run() -> Result<()> {
    let matches = command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.global.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Some(Commands::Config(cmd)) => config::run(cmd, &cli.global, leaf_matches(&matches)),
        Some(Commands::Profile(cmd)) => profile::run(cmd, &cli.global, leaf_matches(&matches)),
        Some(Commands::Completions(args)) => completions::run(args),
        None => query::run(cli.query, &cli.global, &matches),
    }
}

/// Matches of the innermost subcommand, where its flags live.
fn leaf_matches(matches: &ArgMatches) -> &ArgMatches {
    let mut current = matches;
    while let Some((_, sub)) = current.subcommand() {
        current = sub;
    }
    current
}
