// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, so --json output stays clean)
// 3. Load the config and layer the flags over it
// 4. Run the pipeline, cancelling it on Ctrl-C
// 5. Print the report and exit with the matching code:
//    0 = clean or warnings only, 1 = errors found, 2 = internal failure,
//    130 = interrupted
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use cli::{CheckArgs, Cli, Commands};
use doc_link_guardian::checker::slugify;
use doc_link_guardian::{Config, Outcome, Report};

const EXIT_INTERNAL: i32 = 2;
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_INTERNAL
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins when set; otherwise warnings, or everything from our crate
// with --verbose
fn init_logging(verbose: bool) {
    let default = if verbose {
        "doc_link_guardian=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check(args) => handle_check(args).await,
        Commands::Slug { text } => {
            println!("{}", slugify(&text));
            Ok(0)
        }
    }
}

// Handles the 'check' subcommand
async fn handle_check(args: CheckArgs) -> Result<i32> {
    let mut config = Config::load(&args.root, args.config.as_deref())
        .context("failed to load configuration")?;
    args.apply(&mut config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the links in flight");
            on_interrupt.cancel();
        }
    });

    if !args.json {
        println!("🔍 Checking {}", args.root.display());
    }

    let report = doc_link_guardian::run(&config, cancel).await?;
    print_results(&report, args.json)?;

    let code = if report.cancelled {
        EXIT_CANCELLED
    } else {
        match report.outcome {
            Outcome::Clean | Outcome::WarningsOnly => 0,
            Outcome::Errors => 1,
        }
    };
    Ok(code)
}

// Prints the report either as a table or JSON
fn print_results(report: &Report, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

// Prints findings as a human-readable table in the terminal
fn print_table(report: &Report) {
    if report.findings.is_empty() {
        println!("✅ No problems found");
    } else {
        println!("{:<50} {:<10} {:<12} {}", "LOCATION", "LINE:COL", "SEVERITY", "MESSAGE");
        println!("{}", "=".repeat(105));

        for finding in &report.findings {
            let file = finding.file.display().to_string();
            // Keep the end of long paths, it's the part that identifies the file
            let file_display = match file.char_indices().rev().nth(46) {
                Some((start, _)) if file.chars().count() > 50 => format!("...{}", &file[start..]),
                _ => file,
            };
            let position = format!("{}:{}", finding.line, finding.column);
            println!(
                "{:<50} {:<10} {:<12} {}",
                file_display, position, finding.severity, finding.message
            );
        }
    }

    println!();

    let summary = &report.summary;
    println!("📊 Summary:");
    println!("   📄 Files: {}", summary.files_processed);
    println!(
        "   🔗 Links: {} checked, {} resolved, {} failed",
        summary.links_checked, summary.links_resolved, summary.links_failed
    );
    if summary.orphans > 0 {
        println!("   🗑️  Orphaned resources: {}", summary.orphans);
    }
    println!("   ❌ Errors: {}", summary.errors);
    println!("   ⚠️  Warnings: {}", summary.warnings);
    println!("   💡 Suggestions: {}", summary.suggestions);
    if report.cancelled {
        println!("   ⏹️  Run interrupted, results are incomplete");
    }
}
