use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use scene_audit::subtitle::{parse_segments, render_srt};
use scene_audit::{analyze, load_corpus, AppError, AppResult, Policy};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "scene-audit",
    about = "Detect repetition, boilerplate and vocabulary problems in generated scene corpora",
    version
)]
struct Cli {
    /// YAML policy overriding the default vocabularies and thresholds
    #[arg(long, value_name = "PATH", global = true)]
    policy: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a scene corpus and print the JSON report
    Analyze {
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Render a JSON list of transcript segments as SubRip
    Srt {
        #[arg(value_name = "SEGMENTS")]
        segments: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {}", err.message());
        process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let level = parse_log_level(&cli.log_level)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze { corpus, compact } => {
            let policy = Policy::load(cli.policy.as_deref())?;
            let scenes = load_corpus(&corpus)?;
            let report = analyze(&scenes, &policy);
            let json = if compact {
                serde_json::to_string(&report)
            } else {
                serde_json::to_string_pretty(&report)
            }
            .map_err(|e| AppError::internal(format!("failed to serialize report: {e}")))?;
            println!("{json}");
            Ok(())
        }
        Commands::Srt { segments } => {
            let data = std::fs::read_to_string(&segments).map_err(|e| {
                AppError::usage(format!("failed to read {}: {e}", segments.display()))
            })?;
            let segments = parse_segments(&data)?;
            print!("{}", render_srt(&segments));
            Ok(())
        }
    }
}

fn parse_log_level(value: &str) -> AppResult<Level> {
    match value {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(AppError::usage(format!(
            "invalid --log-level '{value}'; expected error|warn|info|debug|trace"
        ))),
    }
}
