//! Mimic CLI - Command-line tools for replay transcripts

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimic_core::config::MimicConfig;
use mimic_core::transcript::Transcript;

#[derive(Parser)]
#[command(name = "mimic")]
#[command(about = "Inspect and canonicalise Mimic replay transcripts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse transcripts and list their calls
    Check {
        /// Transcript files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-render a transcript in canonical form
    Fmt {
        /// Transcript file
        file: PathBuf,

        /// Rewrite the file instead of printing to stdout
        #[arg(short, long)]
        write: bool,

        /// Body indentation (defaults to the configured value)
        #[arg(long, env = "MIMIC_INDENT")]
        indent: Option<usize>,
    },
    /// Version information
    Version,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("mimic {}", env!("CARGO_PKG_VERSION"));
            println!("mimic-core {}", mimic_core::VERSION);
        }
        Commands::Check { files } => {
            let mut failed = 0usize;
            for file in &files {
                match check(file) {
                    Ok(()) => {}
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {:#}", file.display(), e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} transcript(s) failed to parse", failed, files.len());
            }
        }
        Commands::Fmt {
            file,
            write,
            indent,
        } => {
            let indent = match indent {
                Some(indent) => indent,
                None => MimicConfig::load()?.indent,
            };
            let config = MimicConfig {
                indent,
                ..MimicConfig::default()
            };
            config.validate()?;

            let transcript = read_transcript(&file)?;
            let rendered = transcript.render(config.indent);
            if write {
                std::fs::write(&file, &rendered)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                tracing::info!(file = %file.display(), records = transcript.records.len(), "Formatted transcript");
            } else {
                print!("{}", rendered);
            }
        }
    }

    Ok(())
}

fn read_transcript(path: &Path) -> Result<Transcript> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Transcript::parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn check(path: &Path) -> Result<()> {
    let transcript = read_transcript(path)?;
    println!(
        "{}: {} call(s), {} test input(s)",
        path.display(),
        transcript.records.len(),
        transcript.inputs.len()
    );
    for (name, value) in transcript.inputs.iter() {
        println!("  input {} = {}", name, value);
    }
    for record in &transcript.records {
        println!("  {}", record.signature());
    }
    Ok(())
}
