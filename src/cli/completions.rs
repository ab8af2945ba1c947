//! Shell completion generation

use anyhow::Result;
use clap::Args;
use clap_complete::{generate, Shell};
use std::io;

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = super::command();
    generate(args.shell, &mut cmd, "pplx", &mut io::stdout());
    Ok(())
}
