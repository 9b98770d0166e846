//! ARIA CLI entry point.
//!
//! Provides `resolve`, `repl`, `suggest` and `check-config` subcommands for
//! resolving a single utterance, holding a conversation on stdin, completing
//! a partial command, or validating configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use aria::config::AssistantConfig;
use aria::dispatch::{ActionDispatcher, DispatchOutcome, DryRunDispatcher};
use aria::logging::{self, LoggingGuard};
use aria::resolver::IntentResolver;
use aria::session::{Resolution, SessionHandle};
use aria::suggest::{Suggester, DEFAULT_LIMIT};
use aria::types::{Decision, Utterance};

/// ARIA: turn natural-language commands into action decisions.
#[derive(Parser)]
#[command(name = "aria", version, about)]
struct Cli {
    /// Configuration file (default: `$ARIA_CONFIG_PATH` or `./aria.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Resolve one utterance and print the decision.
    Resolve {
        /// Utterance text.
        text: String,
        /// Treat the text as a voice transcription.
        #[arg(long)]
        voice: bool,
        /// Transcription confidence in [0, 1] (with `--voice`).
        #[arg(long, requires = "voice")]
        confidence: Option<f64>,
        /// Print the decision as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Hold a conversation on stdin with dry-run dispatch.
    Repl,
    /// Suggest completions for a partial command.
    Suggest {
        /// Partial command text.
        partial: String,
        /// Maximum number of suggestions.
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Validate configuration and vocabulary, then print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let _logging_guard = init_logging(&config)?;

    match cli.command {
        Command::Resolve {
            text,
            voice,
            confidence,
            json,
        } => handle_resolve(&config, text, voice, confidence, json).await,
        Command::Repl => handle_repl(&config).await,
        Command::Suggest { partial, limit } => handle_suggest(&config, &partial, limit),
        Command::CheckConfig => handle_check_config(&config),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AssistantConfig> {
    match path {
        Some(path) => AssistantConfig::load_with(path, |key| std::env::var(key).ok()),
        None => AssistantConfig::load(),
    }
    .context("failed to load configuration")
}

fn init_logging(config: &AssistantConfig) -> anyhow::Result<Option<LoggingGuard>> {
    match config.logging.resolved_directory() {
        Some(dir) => logging::init_production(&dir, &config.logging.level).map(Some),
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

fn build_resolver(config: &AssistantConfig) -> anyhow::Result<IntentResolver> {
    IntentResolver::from_config(config).context("failed to initialise intent resolver")
}

/// Resolve a single utterance against an empty context.
async fn handle_resolve(
    config: &AssistantConfig,
    text: String,
    voice: bool,
    confidence: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let resolver = build_resolver(config)?;
    let utterance = if voice {
        Utterance::voice(text, confidence.unwrap_or(1.0))
    } else {
        Utterance::typed(text)
    };

    let decision = resolver.decide(&utterance, &resolver.new_context()).await;
    if json {
        let rendered =
            serde_json::to_string_pretty(&decision).context("failed to serialise decision")?;
        println!("{rendered}");
    } else {
        println!("{}", summarize(&decision));
    }
    Ok(())
}

/// Read utterances from stdin, one per line, in a single session.
async fn handle_repl(config: &AssistantConfig) -> anyhow::Result<()> {
    let resolver = Arc::new(build_resolver(config)?);
    let session = SessionHandle::spawn("repl", Arc::clone(&resolver));
    let dispatcher = DryRunDispatcher::new(config.context.timeout());
    info!("repl started, :history, :reset and :quit are available");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":reset" => {
                session.reset().await?;
                println!("(context cleared)");
                continue;
            }
            ":history" => {
                for turn in session.history().await? {
                    println!(
                        "{}  {}",
                        turn.utterance().text(),
                        summarize(turn.decision())
                    );
                }
                continue;
            }
            _ => {}
        }

        let Resolution::Decided(decision) = session.submit(Utterance::typed(line)).await? else {
            continue;
        };
        println!("{}", summarize(&decision));
        match dispatcher.dispatch(&decision).await {
            Ok(outcome) => println!("  -> {}", describe(&outcome)),
            Err(e) => println!("  -> dispatch failed: {e}"),
        }
    }

    session.shutdown().await;
    Ok(())
}

fn handle_suggest(config: &AssistantConfig, partial: &str, limit: usize) -> anyhow::Result<()> {
    let resolver = build_resolver(config)?;
    let suggester = Suggester::new(resolver.vocabulary());
    for suggestion in suggester.suggest(partial, limit) {
        println!("{}\t{}", suggestion.phrase, suggestion.intent);
    }
    Ok(())
}

fn handle_check_config(config: &AssistantConfig) -> anyhow::Result<()> {
    let resolver = build_resolver(config)?;
    let policy = resolver.config();
    println!("configuration ok");
    println!("  intents:            {}", resolver.vocabulary().len());
    println!("  applications:       {}", config.applications.len());
    println!("  execute threshold:  {}", policy.execute_threshold);
    println!("  confirm threshold:  {}", policy.confirm_threshold);
    println!("  margin threshold:   {}", policy.statistical_margin_threshold);
    println!("  context capacity:   {}", config.context.capacity);
    println!("  context timeout:    {}s", config.context.timeout_seconds);
    let blocked: Vec<&str> = policy.blocked_intents.iter().map(|i| i.as_str()).collect();
    println!("  blocked intents:    {}", blocked.join(", "));
    Ok(())
}

fn summarize(decision: &Decision) -> String {
    let entities: Vec<String> = decision
        .entities()
        .iter()
        .map(|e| format!("{}={:?}", e.kind, e.value))
        .collect();
    let mut line = format!(
        "{} {} ({:.2})",
        decision.verdict(),
        decision.intent(),
        decision.confidence()
    );
    if !entities.is_empty() {
        line.push_str(&format!(" [{}]", entities.join(", ")));
    }
    if !decision.missing_entities().is_empty() {
        let missing: Vec<String> = decision
            .missing_entities()
            .iter()
            .map(ToString::to_string)
            .collect();
        line.push_str(&format!(" missing: {}", missing.join(", ")));
    }
    line
}

fn describe(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Executed { intent } => format!("executed {intent}"),
        DispatchOutcome::AwaitingConfirmation { intent, .. } => {
            format!("{intent} needs confirmation (oui / non)")
        }
        DispatchOutcome::Rejected => "rejected".to_owned(),
        DispatchOutcome::Confirmed { intent } => format!("confirmed, executed {intent}"),
        DispatchOutcome::Cancelled { intent } => format!("cancelled {intent}"),
        DispatchOutcome::Expired => "confirmation expired".to_owned(),
        DispatchOutcome::NotFound => "nothing to confirm".to_owned(),
    }
}
