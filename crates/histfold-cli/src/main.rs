use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use histfold_contracts::events::EventWriter;
use histfold_contracts::names::NameVariantSet;
use histfold_contracts::request::PromptRequest;
use histfold_engine::trace::PipelineTrace;
use histfold_engine::{redact_names, PipelineConfig, PromptEngine};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(
    name = "histfold-rs",
    version,
    about = "Fold chat history into a generation prompt"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Render(RenderArgs),
    Redact(RedactArgs),
}

#[derive(Debug, Parser)]
struct RenderArgs {
    /// JSON prompt request (history, model_name, user_names, ...).
    #[arg(long)]
    request: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    max_sentences: Option<usize>,
    /// Print per-stage history diffs to stderr.
    #[arg(long)]
    trace: bool,
    #[arg(long)]
    fingerprint: bool,
}

#[derive(Debug, Parser)]
struct RedactArgs {
    /// Shell-quoted list of name variants, e.g. `Alex "Alex Smith"`.
    #[arg(long)]
    names: String,
    text: String,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("histfold-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Render(args) => run_render(args),
        Command::Redact(args) => run_redact(args),
    }
}

fn run_render(args: RenderArgs) -> Result<i32> {
    let request = PromptRequest::load(&args.request)?;
    let config = PipelineConfig::from_env().with_max_sentences(args.max_sentences);
    let mut engine = PromptEngine::new(config);
    if let Some(path) = args.events {
        let run_id = uuid::Uuid::new_v4().to_string();
        let writer = EventWriter::new(path, run_id);
        writer.emit_json(
            "request_loaded",
            json!({
                "path": args.request.to_string_lossy(),
                "messages": request.history.len(),
            }),
        )?;
        engine = engine.with_events(writer);
    }

    let build = if args.trace {
        let (build, trace) = engine.build_traced(&request)?;
        print_trace(&trace);
        build
    } else {
        engine.build(&request)?
    };

    println!("{}", build.prompt);
    if args.fingerprint {
        println!("sha256:{}", build.fingerprint);
    }
    Ok(0)
}

fn print_trace(trace: &PipelineTrace) {
    for stage in &trace.stages {
        if !stage.changed() {
            eprintln!("== {} (unchanged, {} messages)", stage.stage, stage.message_count);
            continue;
        }
        eprintln!("== {} ({} messages)", stage.stage, stage.message_count);
        for line in &stage.diff {
            eprintln!("{line}");
        }
    }
}

fn run_redact(args: RedactArgs) -> Result<i32> {
    let names = parse_names(&args.names)?;
    println!("{}", redact_names(&args.text, &names));
    Ok(0)
}

fn parse_names(raw: &str) -> Result<NameVariantSet> {
    let parts = shell_words::split(raw).with_context(|| format!("invalid --names value: {raw}"))?;
    Ok(NameVariantSet::new(parts))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{parse_names, Cli, Command};

    #[test]
    fn parse_names_respects_quotes() -> anyhow::Result<()> {
        let names = parse_names("Alex \"Alex Smith\" 'Big Al'")?;
        assert_eq!(
            names.original_order(),
            &[
                "Alex".to_string(),
                "Alex Smith".to_string(),
                "Big Al".to_string()
            ]
        );
        assert!(parse_names("\"unterminated").is_err());
        Ok(())
    }

    #[test]
    fn cli_parses_render_flags() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "histfold-rs",
            "render",
            "--request",
            "req.json",
            "--max-sentences",
            "3",
            "--trace",
        ])?;
        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.max_sentences, Some(3));
                assert!(args.trace);
                assert!(!args.fingerprint);
                assert!(args.events.is_none());
            }
            Command::Redact(_) => panic!("expected render"),
        }
        Ok(())
    }
}
