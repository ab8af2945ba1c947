//! Query command: resolve and validate the configuration for one request

use anyhow::{Context, Result};
use clap::{ArgMatches, Args};
use pplx::config::model::{Defaults, Output, Search};
use pplx::config::resolve_validated;
use serde::Serialize;

use super::utils::mask_secret;
use super::GlobalArgs;

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Question to ask
    #[arg(value_name = "QUERY")]
    pub query: Vec<String>,
}

/// Everything the request builder needs, as resolved for this invocation.
#[derive(Serialize)]
struct RequestPlan<'a> {
    query: String,
    profile: &'a str,
    defaults: &'a Defaults,
    search: &'a Search,
    output: &'a Output,
    base_url: &'a str,
    timeout: &'a str,
    api_key: String,
}

pub fn run(args: QueryArgs, global: &GlobalArgs, matches: &ArgMatches) -> Result<()> {
    let query = args.query.join(" ");
    if query.trim().is_empty() {
        anyhow::bail!("A query is required (see `pplx --help`)");
    }

    let resolution = resolve_validated(&global.resolve_options(), matches)?;
    let config = &resolution.config;

    if config.api.key.is_empty() {
        tracing::warn!("No API key configured; set api.key in the config file or pass --api-key");
    }

    let plan = RequestPlan {
        query,
        profile: &resolution.profile,
        defaults: &config.defaults,
        search: &config.search,
        output: &config.output,
        base_url: &config.api.base_url,
        timeout: &config.api.timeout,
        api_key: mask_secret(&config.api.key),
    };

    let rendered = if config.output.json {
        serde_json::to_string_pretty(&plan).context("Failed to render request plan as JSON")?
    } else {
        serde_yaml::to_string(&plan).context("Failed to render request plan as YAML")?
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
