//! CLI command implementations.

pub mod assemble;
pub mod disasm;
pub mod run;

use anyhow::{Context, Result};
use rainvm_bytecode::Program;
use std::path::Path;

/// Read and verify a JSON program payload.
pub fn read_program(path: &Path) -> Result<Program> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Program::from_json(&json).with_context(|| format!("Invalid program in {}", path.display()))
}

/// Print a program payload, pretty unless `compact`.
pub fn print_program(program: &Program, compact: bool) -> Result<()> {
    let json = if compact {
        program.to_json()?
    } else {
        program.to_json_pretty()?
    };
    println!("{json}");
    Ok(())
}
