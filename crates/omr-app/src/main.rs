// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OMR grader — grade photographed bubble sheets from the command line.
//
// Entry point. Parses arguments, initialises logging and the grading
// services, and dispatches to the subcommand.

mod render;
mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use omr_core::GraderConfig;
use omr_core::error::{OmrError, Result};
use omr_core::human_errors::humanize_error;
use omr_core::types::{AnswerKey, MissingKeyPolicy};

use services::answer_key::{load_key_file, parse_missing_policy, save_key_file};
use services::app_services::{AppServices, KeySpec, load_config};

#[derive(Debug, Parser)]
#[command(name = "omr-grader")]
#[command(about = "Grade photographed multiple-choice bubble sheets against an answer key")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Grade one or more sheet photos.
    Grade(GradeArgs),

    /// Print the answers detected on a sheet without grading.
    Detect(DetectArgs),

    /// Print the default grader configuration as JSON.
    Config,

    /// Check an answer key written as letters and save it as a key file.
    Key {
        /// Key letters, e.g. "ABCDE?BAC" ('?' for no answer).
        letters: String,

        /// Where to write the key file.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct GradeArgs {
    /// Sheet photos (JPEG or PNG).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Answer key as letters, e.g. "ABCDEABCDE..." ('?' for no answer).
    #[arg(long, conflicts_with = "key_file", required_unless_present = "key_file")]
    key: Option<String>,

    /// Answer key file: {"answers": ["A", "C", null, ...]}.
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// What to do with questions the key has no answer for:
    /// fail, skip, or default:<LETTER>.
    #[arg(long, default_value = "fail", value_parser = parse_missing_policy)]
    missing: MissingKeyPolicy,

    #[command(flatten)]
    common: CommonArgs,

    /// Sheets graded at the same time (defaults to the number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Sheet photo (JPEG or PNG).
    image: PathBuf,

    /// Write rectified.png and ink_mask.png into this directory.
    #[arg(long)]
    previews: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Grader configuration file (JSON). Missing keys use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Also decode the student-identity header.
    #[arg(long)]
    student_info: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "omr-grader starting");

    let result = match cli.command {
        Commands::Grade(args) => run_grade(args).await,
        Commands::Detect(args) => run_detect(args),
        Commands::Config => run_config(),
        Commands::Key { letters, out } => run_key(&letters, &out),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            let human = humanize_error(&err);
            eprintln!("Error: {}", human.message);
            eprintln!("Suggestion: {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn services_for(common: &CommonArgs) -> Result<AppServices> {
    let mut config = load_config(common.config.as_deref())?;
    if common.student_info {
        config.student_info.enabled = true;
    }
    AppServices::with_config(config)
}

fn key_from_args(args: &GradeArgs) -> Result<AnswerKey> {
    match (&args.key, &args.key_file) {
        (Some(letters), _) => AnswerKey::from_letters(letters),
        (None, Some(path)) => load_key_file(path),
        (None, None) => Err(OmrError::InvalidAnswerKey(
            "pass --key or --key-file".into(),
        )),
    }
}

async fn run_grade(args: GradeArgs) -> Result<ExitCode> {
    let services = services_for(&args.common)?;
    let key = KeySpec {
        key: key_from_args(&args)?,
        policy: args.missing,
    };
    let questions = services.config().grid.rows as usize;
    if key.key.len() != questions {
        return Err(OmrError::KeyLengthMismatch {
            key: key.key.len(),
            answers: questions,
        });
    }
    let jobs = args.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let results = services.grade_batch(key, args.images, jobs).await;
    let failed = results.iter().filter(|r| r.outcome.is_err()).count();

    if args.common.json {
        println!("{}", render::results_json(&results)?);
    } else {
        for (i, result) in results.iter().enumerate() {
            if i > 0 {
                println!();
            }
            let lines = match &result.outcome {
                Ok(sheet) => render::render_graded(&result.path, sheet),
                Err(err) => render::render_failure(&result.path, err),
            };
            for line in lines {
                println!("{line}");
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_detect(args: DetectArgs) -> Result<ExitCode> {
    let services = services_for(&args.common)?;
    let scan = services.detect(&args.image)?;

    if let Some(dir) = &args.previews {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join("rectified.png"), scan.rectified_png()?)?;
        std::fs::write(dir.join("ink_mask.png"), scan.ink_mask_png()?)?;
        tracing::info!(dir = %dir.display(), "Previews written");
    }

    if args.common.json {
        let body = serde_json::json!({
            "path": args.image.display().to_string(),
            "answers": scan.answers,
            "student_info": scan.student_info,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for line in render::render_detected(&args.image, &scan) {
            println!("{line}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_config() -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&GraderConfig::default())?);
    Ok(ExitCode::SUCCESS)
}

fn run_key(letters: &str, out: &Path) -> Result<ExitCode> {
    let key = AnswerKey::from_letters(letters)?;
    save_key_file(out, &key)?;
    println!(
        "Saved {} answers ({}) to {}",
        key.len(),
        key.to_letters(),
        out.display()
    );
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use omr_core::types::ChoiceIndex;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn grade_accepts_inline_key_and_policy() {
        let cli = Cli::try_parse_from([
            "omr-grader",
            "grade",
            "a.jpg",
            "b.jpg",
            "--key",
            "ABCDE",
            "--missing",
            "default:b",
            "--jobs",
            "3",
            "--json",
        ])
        .expect("parse");

        let Commands::Grade(args) = cli.command else {
            panic!("expected grade");
        };
        assert_eq!(args.images.len(), 2);
        assert_eq!(args.key.as_deref(), Some("ABCDE"));
        assert_eq!(
            args.missing,
            MissingKeyPolicy::UseChoice(ChoiceIndex::new(1).expect("B"))
        );
        assert_eq!(args.jobs, Some(3));
        assert!(args.common.json);
    }

    #[test]
    fn grade_requires_a_key() {
        assert!(Cli::try_parse_from(["omr-grader", "grade", "a.jpg"]).is_err());
        assert!(
            Cli::try_parse_from([
                "omr-grader", "grade", "a.jpg", "--key", "A", "--key-file", "k.json",
            ])
            .is_err()
        );
    }

    #[test]
    fn bad_missing_policy_is_a_usage_error() {
        let result = Cli::try_parse_from([
            "omr-grader", "grade", "a.jpg", "--key", "A", "--missing", "maybe",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn key_file_is_read_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("key.json");
        std::fs::write(&path, r#"{"answers": ["E", null]}"#).expect("write");

        let cli = Cli::try_parse_from([
            "omr-grader",
            "grade",
            "a.jpg",
            "--key-file",
            path.to_str().expect("utf-8 path"),
        ])
        .expect("parse");
        let Commands::Grade(args) = cli.command else {
            panic!("expected grade");
        };
        let key = key_from_args(&args).expect("key");
        assert_eq!(key.to_letters(), "E?");
        assert_eq!(args.missing, MissingKeyPolicy::Fail);
    }

    #[test]
    fn key_command_writes_a_loadable_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("key.json");

        run_key("AB?DE", &path).expect("saved");
        assert_eq!(load_key_file(&path).expect("load").to_letters(), "AB?DE");
        assert!(run_key("ABZ", &path).is_err());
    }

    #[test]
    fn student_info_flag_enables_decoder() {
        let common = CommonArgs {
            config: None,
            json: false,
            student_info: true,
        };
        let services = services_for(&common).expect("services");
        assert!(services.config().student_info.enabled);
    }
}
