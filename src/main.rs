//! ariesim - ARIES crash recovery simulator
//!
//! Parses a transaction schedule, runs it through forward processing, a
//! crash and recovery, then either prints one line per recorded snapshot or
//! saves the whole history as a trace file.
//!
//! ```text
//! ariesim "W_1(A,a), W_2(B,b), Commit_1()"
//! ariesim -f schedule.txt -o trace.json
//! ```

use std::fs;
use std::path::PathBuf;

use log::{error, info};

use ariesim::{History, Parser, Result, SimulationConfig, Simulator, TraceFormat};

/// Command line configuration
#[derive(Debug)]
struct Config {
    /// Schedule given inline
    operations: Option<String>,
    /// Schedule file, read instead of the inline schedule
    file: Option<PathBuf>,
    /// Trace file to write instead of printing snapshots
    output: Option<PathBuf>,
    format: TraceFormat,
    quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operations: None,
            file: None,
            output: None,
            format: TraceFormat::Json,
            quiet: false,
        }
    }
}

fn print_help() {
    println!("ariesim - ARIES crash recovery simulator");
    println!();
    println!("Usage: ariesim [OPTIONS] [OPERATIONS]");
    println!();
    println!("Options:");
    println!("  -f, --file PATH       Read the schedule from a file");
    println!("  -o, --output PATH     Save the snapshot history to a trace file");
    println!("      --format FORMAT   Trace format: json or bincode (default: json)");
    println!("  -q, --quiet           Do not record narration notes");
    println!("  -h, --help            Show this help");
    println!();
    println!("Example:");
    println!("  ariesim \"W_1(A,a), W_2(B,b), Commit_1()\"");
}

/// Parse arguments; `None` means help was printed
fn parse_args(args: &[String]) -> std::result::Result<Option<Config>, String> {
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--file" | "-f" => {
                let path = args.get(i + 1).ok_or("--file needs a path")?;
                config.file = Some(PathBuf::from(path));
                i += 1;
            }
            "--output" | "-o" => {
                let path = args.get(i + 1).ok_or("--output needs a path")?;
                config.output = Some(PathBuf::from(path));
                i += 1;
            }
            "--format" => {
                let name = args.get(i + 1).ok_or("--format needs a value")?;
                config.format = TraceFormat::from_name(name)
                    .ok_or_else(|| format!("unknown trace format '{}'", name))?;
                i += 1;
            }
            "--quiet" | "-q" => config.quiet = true,
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("unknown option '{}'", other));
            }
            other => match config.operations {
                Some(ref mut ops) => {
                    ops.push(' ');
                    ops.push_str(other);
                }
                None => config.operations = Some(other.to_string()),
            },
        }
        i += 1;
    }

    if config.file.is_some() && config.operations.is_some() {
        return Err("give the schedule inline or with --file, not both".to_string());
    }

    Ok(Some(config))
}

fn print_history(history: &History) {
    for (index, snapshot) in history.iter().enumerate() {
        let cursor = snapshot
            .cursor()
            .map(|cursor| cursor.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<8}  {:<8}  log {:>3}  durable {:>3}  {}",
            index,
            snapshot.phase().to_string(),
            cursor,
            snapshot.log().len(),
            snapshot.durable(),
            snapshot.notes().join("; ")
        );
    }
}

fn run(config: Config) -> Result<()> {
    let source = match (&config.file, &config.operations) {
        (Some(path), None) => fs::read_to_string(path)?,
        (_, Some(ops)) => ops.clone(),
        (None, None) => String::new(),
    };

    let operations = Parser::parse(&source)?;
    info!("Parsed {} operations", operations.len());

    let simulation = if config.quiet {
        SimulationConfig::quiet()
    } else {
        SimulationConfig::default()
    };
    let history = Simulator::new(simulation).run(&operations)?;

    match config.output {
        Some(path) => history.save(&path, config.format)?,
        None => print_history(&history),
    }
    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = match parse_args(&args) {
        Ok(Some(config)) => config,
        Ok(None) => return,
        Err(message) => {
            error!("{}", message);
            eprintln!("Try 'ariesim --help' for more information.");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(config) {
        error!("{}", e);
        eprintln!("ariesim: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("ariesim")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_inline_schedule_words_are_joined() {
        let config = parse_args(&args(&["W_1(A,x),", "Commit_1()", "-q"]))
            .unwrap()
            .unwrap();
        assert_eq!(config.operations.as_deref(), Some("W_1(A,x), Commit_1()"));
        assert!(config.quiet);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_file_and_inline_schedule_conflict() {
        let err = parse_args(&args(&["-f", "schedule.txt", "W_1(A,x)"])).unwrap_err();
        assert!(err.contains("not both"));
        assert!(parse_args(&args(&["-f", "schedule.txt"])).is_ok());
    }

    #[test]
    fn test_format_and_missing_values() {
        let config = parse_args(&args(&["-o", "t.bin", "--format", "bincode"]))
            .unwrap()
            .unwrap();
        assert_eq!(config.format, TraceFormat::Bincode);
        assert!(parse_args(&args(&["--format", "yaml"])).is_err());
        assert!(parse_args(&args(&["-o"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }
}
