//! `ralph` command-line entry point.
//!
//! Loop state lives in `<project>/.opencode/ralph-state.json`; the agent
//! command and default budget come from `<project>/.opencode/ralph.toml`.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use ralph::controller::{LoopController, StartRequest};
use ralph::exit_codes;
use ralph::io::config::load_config;
use ralph::io::launcher::DetachedLauncher;
use ralph::io::paths::ProjectPaths;
use ralph::io::state_store::FileStateStore;
use ralph::logging;
use ralph::session::Session;
use ralph::tools::tool_definitions;

#[derive(Parser)]
#[command(
    name = "ralph",
    version,
    about = "Relaunch an agent with the same instruction until it reports completion"
)]
struct Cli {
    /// Project root (holds `.opencode/`).
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Arm a new loop, replacing any previous one.
    Start {
        /// Instruction re-sent on every iteration.
        prompt: String,
        /// Exact text the agent prints only when the task is done.
        #[arg(long)]
        completion_promise: Option<String>,
        /// Iteration budget; non-positive values use the configured default.
        #[arg(long, allow_negative_numbers = true)]
        max_iterations: Option<i64>,
    },
    /// Disarm the active loop (a running agent is not interrupted).
    Cancel,
    /// Print the loop state as JSON. Exits with 2 when no loop is active.
    Status,
    /// Evaluate one end-of-turn event, relaunching the agent if needed.
    Idle {
        /// Latest assistant text.
        #[arg(long, conflicts_with = "output_file")]
        output: Option<String>,
        /// Read the latest assistant text from a file.
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Serve the JSON-lines host protocol on stdin/stdout.
    Session,
    /// Print tool definitions as JSON.
    Tools,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Start {
            prompt,
            completion_promise,
            max_iterations,
        } => cmd_start(
            &cli.project,
            StartRequest {
                instruction: prompt,
                completion_signal: completion_promise,
                max_iterations,
            },
        ),
        Command::Cancel => cmd_cancel(&cli.project),
        Command::Status => cmd_status(&cli.project),
        Command::Idle {
            output,
            output_file,
        } => cmd_idle(&cli.project, output, output_file.as_deref()),
        Command::Session => cmd_session(&cli.project),
        Command::Tools => cmd_tools(),
    }
}

fn open_controller(project: &Path) -> Result<LoopController<FileStateStore, DetachedLauncher>> {
    let paths = ProjectPaths::new(project);
    let config = load_config(&paths.config_path)?;
    let launcher = DetachedLauncher::from_config(&config.agent);
    Ok(LoopController::new(
        project,
        FileStateStore::for_project(project),
        launcher,
        config,
    ))
}

fn cmd_start(project: &Path, request: StartRequest) -> Result<i32> {
    let mut controller = open_controller(project)?;
    println!("{}", controller.start(request)?);
    Ok(exit_codes::OK)
}

fn cmd_cancel(project: &Path) -> Result<i32> {
    let mut controller = open_controller(project)?;
    println!("{}", controller.cancel()?);
    Ok(exit_codes::OK)
}

fn cmd_status(project: &Path) -> Result<i32> {
    let controller = open_controller(project)?;
    let state = controller.state();
    println!(
        "{}",
        serde_json::to_string_pretty(&state).context("serialize loop state")?
    );
    Ok(if state.active {
        exit_codes::OK
    } else {
        exit_codes::INACTIVE
    })
}

fn cmd_idle(project: &Path, output: Option<String>, output_file: Option<&Path>) -> Result<i32> {
    let text = match (output, output_file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        (None, None) => String::new(),
    };
    let mut controller = open_controller(project)?;
    controller.observe_message("assistant", &Value::String(text));
    let report = controller.on_idle();
    println!(
        "{} {}/{}{}",
        report.verdict.as_str(),
        report.iterations,
        report.max_iterations,
        if report.launched { " launched" } else { "" }
    );
    Ok(exit_codes::OK)
}

fn cmd_session(project: &Path) -> Result<i32> {
    let mut session = Session::new(open_controller(project)?);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    session.run(stdin.lock(), stdout.lock())?;
    Ok(exit_codes::OK)
}

fn cmd_tools() -> Result<i32> {
    let mut out = BufWriter::new(std::io::stdout().lock());
    serde_json::to_writer_pretty(&mut out, &tool_definitions()).context("serialize tools")?;
    writeln!(out).context("write tools")?;
    Ok(exit_codes::OK)
}
