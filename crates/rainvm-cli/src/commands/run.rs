//! Run command - execute a JSON program on the reference machine.

use anyhow::{Context, Result};
use clap::Args;
use rainvm_core::{Interpreter, StaticContext};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RunCommand {
    /// JSON program payload
    pub program: PathBuf,

    /// TOML file describing the block, caller, sale state and balances
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Print the whole final stack, peak depth and step count
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl RunCommand {
    pub fn run(&self) -> Result<()> {
        let program = super::read_program(&self.program)?;
        let context = match &self.context {
            Some(path) => load_context(path)?,
            None => StaticContext::new(),
        };

        let outcome = Interpreter::new()
            .execute(&program, &context)
            .with_context(|| format!("Execution of {} failed", self.program.display()))?;

        println!("{}", outcome.result);
        if self.verbose {
            let stack: Vec<String> = outcome.stack.iter().map(ToString::to_string).collect();
            println!("stack: [{}]", stack.join(", "));
            println!("peak depth: {}", outcome.peak_depth);
            println!("steps: {}", outcome.steps);
        }
        Ok(())
    }
}

fn load_context(path: &Path) -> Result<StaticContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))
}
