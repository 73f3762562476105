pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "hexbot",
    about = "Hexbot operator CLI",
    long_about = "Inspect hexbot configuration, render color previews, and validate runtime readiness without talking to Discord.",
    after_help = "Examples:\n  hexbot preview '#ff8800' --json\n  hexbot manifest\n  hexbot doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Render the preview payload for a color without talking to Discord")]
    Preview {
        #[arg(help = "Color to preview: hex, rgb(), hsl(), hsv() or r,g,b; random when omitted")]
        color: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the slash-command manifest that startup registers, as JSON")]
    Manifest,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, token readiness, and command-manifest shape")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Preview { color, json } => commands::preview::run(color.as_deref(), json),
        Command::Manifest => commands::manifest::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
