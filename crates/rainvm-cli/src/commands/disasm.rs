//! Disasm command - list a JSON program instruction by instruction.

use anyhow::Result;
use clap::Args;
use rainvm_bytecode::{Layout, disassemble};
use std::path::PathBuf;

#[derive(Args)]
pub struct DisasmCommand {
    /// JSON program payload
    pub program: PathBuf,
}

impl DisasmCommand {
    pub fn run(&self) -> Result<()> {
        let program = super::read_program(&self.program)?;
        print!("{}", disassemble(&program, Layout::DEFAULT)?);
        Ok(())
    }
}
