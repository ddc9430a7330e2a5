//! hoprx — Microchip HCS200/HCS300 KeeLoq remote decoder.
//!
//! Reads demodulated pulse captures (JSON capture files, or text
//! level/duration pairs on stdin), runs the HCS200 / Intellicode profiles
//! over them, and prints one structured record per decoded transmission to
//! stdout. Diagnostics go to stderr.

mod bitbuffer;
mod capture;
mod protocols;
mod radio;
mod report;
mod storage;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capture::{CaptureError, PulseCapture, RfHint};
use protocols::DecoderRegistry;
use storage::{OutputFormat, Storage};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "\
hoprx — Microchip HCS200/HCS300 KeeLoq remote decoder

Usage: hoprx [OPTIONS] [FILE...]

Reads pulse captures from FILEs (.json capture files; anything else is
parsed as text pulse pairs) or, with no FILE, text pairs from stdin:
one `H <µs>` / `L <µs>` per line, `#` comments, blank line between
captures.

Options:
  -f, --format <auto|table|jsonl>   record rendering on stdout
  -p, --profiles <name,...>         decoder profiles to enable
  -v, --verbose                     debug diagnostics on stderr
  -h, --help                        show this help
  -V, --version                     show version

Exit status: 0 if at least one transmission decoded, 1 otherwise.
";

struct CliArgs {
    format: Option<OutputFormat>,
    profiles: Option<Vec<String>>,
    verbose: bool,
    files: Vec<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        format: None,
        profiles: None,
        verbose: false,
        files: Vec::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{}", USAGE);
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("hoprx {}", VERSION);
                std::process::exit(0);
            }
            "-v" | "--verbose" => parsed.verbose = true,
            "-f" | "--format" => {
                let value = args.next().context("--format needs a value")?;
                parsed.format = Some(
                    OutputFormat::parse(&value)
                        .with_context(|| format!("unknown format {:?}", value))?,
                );
            }
            "-p" | "--profiles" => {
                let value = args.next().context("--profiles needs a value")?;
                parsed.profiles = Some(
                    value
                        .split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect(),
                );
            }
            other if other.starts_with('-') && other.len() > 1 => {
                bail!("unknown option {:?}\n\n{}", other, USAGE);
            }
            _ => parsed.files.push(PathBuf::from(arg)),
        }
    }
    Ok(parsed)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "hoprx=debug" } else { "hoprx=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(atty::is(atty::Stream::Stderr)),
        )
        .init();
}

/// Load every capture named on the command line, or stdin when none is.
fn collect_captures(files: &[PathBuf]) -> Result<Vec<PulseCapture>> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(capture::parse_pulse_text(&text)?);
    }

    let mut captures = Vec::new();
    for path in files {
        let loaded = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
            capture::load_json(path)?
        } else {
            let text = std::fs::read_to_string(path).map_err(|source| CaptureError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let mut parsed = capture::parse_pulse_text(&text)?;
            for cap in &mut parsed {
                cap.source_file = Some(path.display().to_string());
            }
            parsed
        };
        if loaded.is_empty() {
            tracing::warn!("no pulse data in {:?}", path);
        }
        captures.extend(loaded);
    }
    Ok(captures)
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    init_logging(args.verbose);

    let storage = Storage::new()?;

    let format = match args.format.unwrap_or(storage.config.format) {
        OutputFormat::Auto => {
            if atty::is(atty::Stream::Stdout) {
                OutputFormat::Table
            } else {
                OutputFormat::Jsonl
            }
        }
        explicit => explicit,
    };

    let enabled = args.profiles.unwrap_or_else(|| storage.config.profiles.clone());
    let (registry, unknown) = DecoderRegistry::with_enabled(&enabled);
    for name in &unknown {
        tracing::warn!("unknown profile {:?} ignored", name);
    }
    if registry.is_empty() {
        bail!("no known decoder profiles enabled");
    }
    tracing::debug!(profiles = ?registry.profile_names(), "dispatching with");

    let captures = collect_captures(&args.files)?;
    tracing::info!("loaded {} capture(s)", captures.len());

    let mut decoded = 0usize;
    for cap in &captures {
        match registry.process(&cap.pairs(), cap.rf.map(RfHint::modulation)) {
            Some((profile, record)) => {
                decoded += 1;
                tracing::debug!(profile, source = cap.source_label(), "record emitted");
                match format {
                    OutputFormat::Jsonl => println!("{}", report::render_jsonl(&record, cap.timestamp)),
                    // table blocks end with a newline; the extra one
                    // separates consecutive records
                    _ => println!("{}", report::render_table(&record, cap.timestamp)),
                }
            }
            None => {
                tracing::debug!(source = cap.source_label(), "no profile matched");
            }
        }
    }

    tracing::info!("decoded {} of {} capture(s)", decoded, captures.len());
    if decoded == 0 {
        std::process::exit(1);
    }
    Ok(())
}
