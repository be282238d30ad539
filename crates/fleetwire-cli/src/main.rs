use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use fleetwire_core::decoder::DecodeContext;
use fleetwire_core::identity::MemoryIdentityStore;
use fleetwire_core::media::MemoryMediaSink;
use fleetwire_core::protocols;

#[derive(Parser, Debug)]
#[command(name = "fleetwire")]
#[command(version)]
#[command(
    about = "Developer replay tool for tracker wire protocols.",
    long_about = None,
    after_help = "Examples:\n  fleetwire replay frames.log --protocol gt06 -o report.json\n  fleetwire replay frames.log --protocol gps103 --stdout --pretty\n  fleetwire protocols"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a frame log through one protocol decoder and dump the
    /// decoded positions as JSON.
    #[command(
        after_help = "The frame log holds one frame per line: hex digits for binary\nprotocols, the raw sentence for text protocols. Devices are\nauto-registered; frames that fail to decode are reported on stderr\nand skipped."
    )]
    Replay {
        /// Path to the frame log
        input: PathBuf,

        /// Protocol decoder to drive (see `fleetwire protocols`)
        #[arg(short = 'p', long)]
        protocol: String,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        output: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "output")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },

    /// List the available protocol decoders.
    Protocols,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            input,
            protocol,
            output,
            stdout,
            pretty,
            quiet,
        } => cmd_replay(input, protocol, output, stdout, pretty, quiet),
        Commands::Protocols => cmd_protocols(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_protocols() -> Result<(), CliError> {
    for name in protocols::registry().names() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_replay(
    input: PathBuf,
    protocol: String,
    output: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let registry = protocols::registry();
    let mut decoder = registry.by_name(&protocol).ok_or_else(|| {
        CliError::new(
            format!("unknown protocol '{protocol}'"),
            Some(format!(
                "available protocols: {}",
                registry.names().collect::<Vec<_>>().join(", ")
            )),
        )
    })?;

    let content = fs::read_to_string(&input)
        .with_context(|| format!("cannot read {}", input.display()))
        .map_err(|err| {
            CliError::new(
                format!("{err:#}"),
                Some("pass a frame log with one frame per line".to_string()),
            )
        })?;

    let store = MemoryIdentityStore::auto_registering();
    let sink = MemoryMediaSink::new();
    let mut ctx = DecodeContext::new(&store, &sink).with_source("replay:0");

    let mut positions = Vec::new();
    let mut dropped = 0usize;
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match decoder.decode(&mut ctx, &frame_bytes(line)) {
            Ok(decoded) => {
                for position in decoded.positions {
                    store.record_location(&position);
                    positions.push(position);
                }
            }
            Err(err) => {
                dropped += 1;
                if !quiet {
                    eprintln!("line {}: {err}", number + 1);
                }
            }
        }
    }

    let json = if pretty {
        serde_json::to_string_pretty(&positions)
    } else {
        serde_json::to_string(&positions)
    }
    .map_err(|err| CliError::new(format!("cannot serialize report: {err}"), None))?;

    if stdout {
        println!("{json}");
    } else if let Some(path) = output {
        fs::write(&path, &json).map_err(|err| {
            CliError::new(format!("cannot write {}: {err}", path.display()), None)
        })?;
        if !quiet {
            eprintln!(
                "wrote {} positions to {} ({dropped} frames dropped)",
                positions.len(),
                path.display()
            );
        }
    }
    Ok(())
}

/// A line of hex digit pairs (whitespace allowed) is a binary frame;
/// anything else is the raw bytes of a text sentence.
fn frame_bytes(line: &str) -> Vec<u8> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let is_hex = !compact.is_empty()
        && compact.len() % 2 == 0
        && compact.bytes().all(|b| b.is_ascii_hexdigit());
    if is_hex {
        (0..compact.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&compact[i..i + 2], 16).unwrap_or(0))
            .collect()
    } else {
        line.as_bytes().to_vec()
    }
}
