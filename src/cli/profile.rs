//! Profile command implementation
//!
//! Every subcommand edits the config file chosen by `--config`, discovery, or
//! the per-user default location, in that order.

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Subcommand};
use pplx::config::{load_from, save, ConfigData, Merger, NamedProfile, Profile, ProfileManager};
use std::fs;
use std::path::PathBuf;

use super::utils::target_config_path;
use super::GlobalArgs;

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// List profiles; the active one is marked with '*'
    List,

    /// Print a profile's settings
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Create a profile, seeded from any configuration flags given
    Create(CreateArgs),

    /// Delete a profile
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Make a profile the active one
    Use {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Write a profile as YAML to stdout or a file
    Export {
        #[arg(value_name = "NAME")]
        name: String,

        /// Destination file
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Add a profile from an exported YAML file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Replace an existing profile with the same name
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Short description shown by `profile list`
    #[arg(short = 'd', long, value_name = "TEXT")]
    pub description: Option<String>,
}

pub fn run(cmd: ProfileCommand, global: &GlobalArgs, matches: &ArgMatches) -> Result<()> {
    let path = target_config_path(global)?;
    let mut config = if path.exists() { load_from(&path)? } else { ConfigData::default() };
    let mut manager = ProfileManager::new(&mut config);

    let changed = match cmd {
        ProfileCommand::List => {
            let active = manager.active_profile();
            for name in manager.list_profiles() {
                let marker = if name == active { '*' } else { ' ' };
                let description = manager.load_profile(name)?.description;
                if description.is_empty() {
                    println!("{} {}", marker, name);
                } else {
                    println!("{} {} - {}", marker, name, description);
                }
            }
            false
        }
        ProfileCommand::Show { name } => {
            let exported = manager.export_profile(&name)?;
            print!("{}", serde_yaml::to_string(&exported).context("Failed to render profile")?);
            false
        }
        ProfileCommand::Create(args) => {
            let description = args.description.unwrap_or_default();
            manager.create_profile(&args.name, &description)?;
            manager.update_profile(&args.name, seeded_profile(description, matches))?;
            println!("Created profile {}", args.name);
            true
        }
        ProfileCommand::Delete { name } => {
            manager.delete_profile(&name)?;
            println!("Deleted profile {}", name);
            true
        }
        ProfileCommand::Use { name } => {
            manager.set_active_profile(&name)?;
            println!("Active profile: {}", name);
            true
        }
        ProfileCommand::Export { name, output } => {
            let exported = manager.export_profile(&name)?;
            let yaml = serde_yaml::to_string(&exported).context("Failed to render profile")?;
            match output {
                Some(file) => {
                    fs::write(&file, yaml)
                        .with_context(|| format!("Failed writing {}", file.display()))?;
                    println!("Exported profile {} to {}", name, file.display());
                }
                None => print!("{}", yaml),
            }
            false
        }
        ProfileCommand::Import { file, overwrite } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed reading {}", file.display()))?;
            let imported: NamedProfile = serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid profile file: {}", file.display()))?;
            let name = imported.name.clone();
            manager.import_profile(imported, overwrite)?;
            println!("Imported profile {}", name);
            true
        }
    };

    if changed {
        save(&config, &path)?;
        tracing::debug!("Saved profiles to {}", path.display());
    }
    Ok(())
}

/// Profile holding only the settings passed as flags to `profile create`.
fn seeded_profile(description: String, matches: &ArgMatches) -> Profile {
    let mut scratch = ConfigData::default();
    Merger::new(matches).merge_with_flags(&mut scratch);
    Profile {
        description,
        defaults: scratch.defaults,
        search: scratch.search,
        output: scratch.output,
    }
}
