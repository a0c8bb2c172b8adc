//! # codesmith CLI
//!
//! Command-line interface for the staged coding pipeline.
//!
//! Usage:
//!   codesmith <task>
//!   codesmith run <task>
//!   codesmith history
//!
//! Examples:
//!   codesmith "print the first ten primes"
//!   codesmith --timeout 30 "walk a directory and count files"
//!   codesmith history

use clap::{Parser, Subcommand};
use codesmith_engine::{
    GitHubModelsProvider, ProviderConfig, SandboxConfig, SessionStore, Verdict, TOKEN_ENV_VAR,
};
use codesmith_pipeline::{Pipeline, PipelineConfig, RunReport, Stage};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "codesmith")]
#[command(author, version, about = "codesmith - task in, generated code out, outcome logged")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Task to execute (when not using subcommands)
    #[arg(trailing_var_arg = true)]
    task: Vec<String>,

    /// Path of the JSON session store
    #[arg(long, default_value = "memory_db.json", global = true)]
    session_file: PathBuf,

    /// Path of the append-only evolution log
    #[arg(long, default_value = "evolution_log.txt", global = true)]
    evolution_file: PathBuf,

    /// Interpreter that runs the generated code
    #[arg(long, default_value = "python3", global = true)]
    interpreter: String,

    /// Wall-clock limit for the generated code, in seconds
    #[arg(long, default_value = "10", global = true)]
    timeout: u64,

    /// Enable verbose output (show the plan and the generated code)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only show the final outcome
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task through the pipeline
    Run {
        /// The task description
        #[arg(trailing_var_arg = true, required = true)]
        task: Vec<String>,
    },
    /// Show the stored exchanges and the knowledge scalar
    History,
}

fn stage_banner(stage: Stage, message: &str) {
    let label = format!("[{}]", stage.agent_label());
    let colored_label = match stage {
        Stage::Planning => label.cyan(),
        Stage::Auditing => label.red(),
        Stage::Coding => label.blue(),
        Stage::Sandboxing => label.yellow(),
        Stage::Evolving => label.magenta(),
        Stage::Done => label.green(),
    };
    println!("{} {}", colored_label.bold(), message);
}

fn print_report(report: &RunReport, verbose: bool) {
    if verbose {
        println!("\n{}", "--- plan ---".dimmed());
        println!(
            "{}",
            serde_json::to_string_pretty(&report.plan).unwrap_or_default()
        );
        if let Some(code) = &report.code {
            println!("\n{}", "--- generated code ---".dimmed());
            println!("{}", code);
        }
    }

    println!();
    match &report.verdict {
        Some(Verdict::Success { stdout }) => {
            println!("{}", "[ok] the generated code ran cleanly".green().bold());
            if !stdout.is_empty() {
                print!("{}", stdout);
            }
        }
        Some(verdict) => {
            println!(
                "{} {}",
                "[failed]".red().bold(),
                verdict.detail().trim_end()
            );
        }
        None => {
            println!(
                "{} {}",
                "[stopped]".red().bold(),
                report.audit.summary
            );
        }
    }

    if let Some(advice) = &report.advice {
        println!(
            "{} {}",
            "[evolution]".magenta(),
            advice.lines().next().unwrap_or_default()
        );
    }
    println!("{}", format!("knowledge: {:.1}", report.knowledge).dimmed());
}

async fn run_task(cli: &Cli, task: &str) {
    let provider = GitHubModelsProvider::new(ProviderConfig::github_models());

    let config = PipelineConfig {
        session_file: cli.session_file.clone(),
        evolution_file: cli.evolution_file.clone(),
        sandbox: SandboxConfig::default()
            .with_interpreter(&cli.interpreter)
            .with_timeout(Duration::from_secs(cli.timeout)),
        ..PipelineConfig::default()
    };

    let pipeline = match Pipeline::new(provider, config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} {}", "[error]".red().bold(), e);
            return;
        }
    };

    let mut pipeline = if cli.quiet {
        pipeline
    } else {
        pipeline.on_stage(|stage, message| stage_banner(stage, message))
    };

    // Failures are narrated, never raised: the process exits normally
    match pipeline.run(task).await {
        Ok(report) => print_report(&report, cli.verbose),
        Err(e) => eprintln!("{} {}", "[error]".red().bold(), e),
    }
}

fn show_history(session_file: &PathBuf) {
    let store = match SessionStore::open_file(session_file) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{} {}", "[error]".red().bold(), e);
            return;
        }
    };

    let log = store.log();
    if log.is_empty() {
        println!("(no exchanges recorded in {})", session_file.display());
    } else {
        for (i, exchange) in log.sessions.iter().enumerate() {
            println!("{}", format!("--- exchange {} ---", i + 1).dimmed());
            println!("{} {}", "Q:".cyan(), exchange.question);
            println!("{} {}", "A:".blue(), exchange.answer);
        }
    }
    println!("{}", format!("knowledge: {:.1}", store.knowledge()).dimmed());
}

/// Read one task line from stdin when none was given on the command line
fn read_task_interactively() -> Option<String> {
    print!("What should we build today? ");
    std::io::stdout().flush().ok()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line).ok()?;
    let task = line.trim().to_string();
    if task.is_empty() {
        None
    } else {
        Some(task)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::History) => {
            show_history(&cli.session_file);
            return;
        }
        Some(Commands::Run { task }) => {
            let task = task.join(" ");
            run(&cli, task).await;
            return;
        }
        None => {}
    }

    let task = if cli.task.is_empty() {
        match read_task_interactively() {
            Some(task) => task,
            None => {
                eprintln!("Error: no task provided.");
                eprintln!("Usage: codesmith [OPTIONS] <TASK>...");
                eprintln!("       codesmith run <TASK>...");
                eprintln!("       codesmith history");
                return;
            }
        }
    } else {
        cli.task.join(" ")
    };

    run(&cli, task).await;
}

async fn run(cli: &Cli, task: String) {
    // Token gate: warn and halt before any stage runs. The provider applies
    // the same gate per call, so library users degrade instead of halting.
    if std::env::var(TOKEN_ENV_VAR).map(|v| v.is_empty()).unwrap_or(true) {
        eprintln!(
            "{} {} is not set; the inference endpoint cannot be reached.",
            "[warning]".yellow().bold(),
            TOKEN_ENV_VAR
        );
        return;
    }

    if !cli.quiet {
        println!("{}\n", "codesmith - staged coding pipeline".bold());
    }

    run_task(cli, &task).await;
}
