mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::EnvFilter;

use commands::assemble::{AfterTimestampCommand, GateCommand, PriceCommand, SaleCommand};
use commands::disasm::DisasmCommand;
use commands::run::RunCommand;

#[derive(Parser)]
#[command(name = "rainvm", version, about = "Assembler for rain VM sale expressions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit a constant gate
    Gate(GateCommand),
    /// Emit a gate that opens after a unix timestamp
    AfterTimestamp(AfterTimestampCommand),
    /// Emit the wallet-capped price rule
    Price(PriceCommand),
    /// Emit the start, end and price bundle of a sale
    Sale(SaleCommand),
    /// Disassemble a JSON program
    Disasm(DisasmCommand),
    /// Execute a JSON program on the reference machine
    Run(RunCommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Gate(cmd) => cmd.run()?,
        Commands::AfterTimestamp(cmd) => cmd.run()?,
        Commands::Price(cmd) => cmd.run()?,
        Commands::Sale(cmd) => cmd.run()?,
        Commands::Disasm(cmd) => cmd.run()?,
        Commands::Run(cmd) => cmd.run()?,
    }

    Ok(())
}
