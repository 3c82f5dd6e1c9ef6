use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use stepscope::debugger::{step_foci, FrameInfo};
use stepscope::protocol::{parse_shell_command, serialize_message, Message, MessageKind, Record, Value};
use stepscope::{logging, ranges};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "stepscope", version, about = "Expression stepping and debugger protocol tools")]
struct Cli {
    /// Log filter for stderr output (e.g. "debug", "stepscope=trace")
    #[arg(long, global = true, env = "STEPSCOPE_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read command lines on stdin and print one serialized command per line
    Shell,
    /// Print one debugger response per expression step of a source file
    Step {
        file: PathBuf,
        /// Give nodes without an end position a two-column range
        #[arg(long)]
        fallback_to_one_char: bool,
        #[arg(long, value_enum, default_value_t = Format::Literal)]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Literal,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.log_level.as_deref());

    match cli.command {
        Command::Shell => run_shell(),
        Command::Step {
            file,
            fallback_to_one_char,
            format,
        } => run_step(&file, fallback_to_one_char, format),
    }
}

fn run_shell() -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        match parse_shell_command(&line) {
            Ok(message) => {
                writeln!(out, "{}", serialize_message(&message)?)?;
                out.flush()?;
            }
            Err(err) => {
                warn!(%err, "rejected command line");
                eprintln!("{err}");
            }
        }
    }
    Ok(())
}

fn run_step(file: &Path, fallback_to_one_char: bool, format: Format) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("could not read {}", file.display()))?;
    let module = ranges::parse_source(&source, fallback_to_one_char)
        .with_context(|| format!("could not parse {}", file.display()))?;
    let foci = step_foci(&module, &source)?;
    info!(file = %file.display(), steps = foci.len(), "stepping");

    let filename = file.display().to_string();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (index, focus) in foci.iter().enumerate() {
        let frame = FrameInfo {
            id: 1,
            filename: filename.clone(),
            code_name: "<module>".to_string(),
            focus: focus.range,
        };
        let completes: Vec<Value> = focus.completes.iter().copied().map(Value::from).collect();
        let response = Message::new(MessageKind::DebuggerResponse, Record::new())
            .with("step", index as i64)
            .with("focus", focus.range)
            .with("text", focus.text.as_str())
            .with("completes", completes)
            .with("stack", vec![Value::from(&frame)]);

        match format {
            Format::Literal => writeln!(out, "{}", serialize_message(&response)?)?,
            Format::Json => writeln!(out, "{}", serde_json::to_string(&response)?)?,
        }
    }
    let done = Message::new(MessageKind::ToplevelResponse, Record::new()).with("command", "Run");
    match format {
        Format::Literal => writeln!(out, "{}", serialize_message(&done)?)?,
        Format::Json => writeln!(out, "{}", serde_json::to_string(&done)?)?,
    }
    out.flush()?;
    Ok(())
}
