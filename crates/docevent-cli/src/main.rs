//! Docevent CLI
//!
//! Command-line interface for:
//! - Resolving sentence-level entity/relation annotations into document-level
//!   event records (`resolve`)
//! - Scoring predicted events, entities and relations against gold
//!   annotations (`eval-events`, `eval-spans`)
//! - Deriving training and scoring data from a ChFinAnn corpus (`project`, `gold`)
//!
//! JSONL output goes to stdout (or `--out`); logs and progress go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docevent_corpus::{gold_corpus, load_corpus, project_corpus};
use docevent_eval::{
    evaluate_entities, evaluate_events, evaluate_relations, EntityMetric, EventEvalConfig,
    RelationMetric, Scoreboard, SpanEvalConfig,
};
use docevent_resolve::{
    read_jsonl_file, resolve_documents, write_jsonl, DocumentEvents, ProximityFallback,
    ResolveConfig, SentenceAnnotation,
};
use docevent_schema::Schema;

#[derive(Parser)]
#[command(name = "docevent")]
#[command(
    author,
    version,
    about = "Docevent: document-level event record resolution"
)]
struct Cli {
    /// Log more (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve sentence annotations (JSONL) into event documents (JSONL).
    Resolve(ResolveArgs),

    /// Score predicted event documents against gold event documents.
    EvalEvents {
        /// Predicted event JSONL
        pred: PathBuf,
        /// Gold event JSONL
        gold: PathBuf,
        /// Share of the gold argument text a prediction must cover.
        #[arg(short = 'p', long, default_value_t = 1.0)]
        proportion: f64,
        /// Roles left out of the overall score (repeatable).
        #[arg(short = 't', long = "exclude")]
        exclude: Vec<String>,
        /// Let several predicted events align to the same gold event.
        #[arg(short = 'r', long)]
        replacement: bool,
        /// Print the scores as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Score predicted sentence annotations against gold ones.
    EvalSpans {
        /// Predicted sentence JSONL
        pred: PathBuf,
        /// Gold sentence JSONL
        gold: PathBuf,
        /// Share of the gold text the `overlap` entity metric requires.
        #[arg(short = 'p', long, default_value_t = 1.0)]
        proportion: f64,
        /// Entity metrics: exact|offset|string|overlap (repeatable, default all).
        #[arg(short = 'e', long = "entity-metric")]
        entity_metrics: Vec<EntityMetric>,
        /// Relation metrics: exact|string (repeatable, default all).
        #[arg(short = 'r', long = "relation-metric")]
        relation_metrics: Vec<RelationMetric>,
        /// Print the scores as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Project the gold events of a ChFinAnn corpus onto sentence annotations.
    Project {
        /// ChFinAnn corpus JSON
        corpus: PathBuf,
        /// Event schema JSON
        schema: PathBuf,
        /// Output JSONL (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write the gold events of a ChFinAnn corpus as event documents.
    Gold {
        /// ChFinAnn corpus JSON
        corpus: PathBuf,
        /// Output JSONL (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Load an event schema and list its event types.
    Schema {
        /// Event schema JSON
        schema: PathBuf,
    },
}

#[derive(Args)]
struct ResolveArgs {
    /// Sentence annotation JSONL
    input: PathBuf,
    /// Event schema JSON
    schema: PathBuf,
    /// Resolution settings JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit only events with more filled roles than this.
    #[arg(short = 'n', long)]
    min_args: Option<usize>,
    /// Drop entities spanning fewer characters than this.
    #[arg(short = 'l', long)]
    min_entity_len: Option<usize>,
    /// Entity types never used as resolution roots (repeatable).
    #[arg(short = 't', long = "exclude")]
    exclude: Vec<String>,
    /// Merge window over the record list.
    #[arg(short = 'w', long)]
    window: Option<usize>,
    /// Preceding sentences a non-primary argument searches for a trigger.
    #[arg(long, conflicts_with = "uncapped_fallback")]
    fallback_distance: Option<usize>,
    /// Let every argument search all preceding sentences for a trigger.
    #[arg(long)]
    uncapped_fallback: bool,
    /// Skip the built-in pattern extractors.
    #[arg(long)]
    no_augment: bool,
    /// Output JSONL (default: stdout)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

impl ResolveArgs {
    fn config(&self) -> Result<ResolveConfig> {
        let mut config = match &self.config {
            Some(path) => ResolveConfig::from_json_file(path)
                .with_context(|| format!("loading resolve config {}", path.display()))?,
            None => ResolveConfig::default(),
        };
        if let Some(min_args) = self.min_args {
            config.min_args = min_args;
        }
        if let Some(min_entity_len) = self.min_entity_len {
            config.min_entity_len = min_entity_len;
        }
        config.excluded_types.extend(self.exclude.iter().cloned());
        if let Some(window) = self.window {
            config.window = window;
        }
        if self.uncapped_fallback {
            config.fallback = ProximityFallback::Uncapped;
        } else if let Some(max_sentences) = self.fallback_distance {
            config.fallback = ProximityFallback::Capped { max_sentences };
        }
        if self.no_augment {
            config.augment = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Resolve(args) => cmd_resolve(&args),
        Commands::EvalEvents {
            pred,
            gold,
            proportion,
            exclude,
            replacement,
            json,
        } => {
            let config = EventEvalConfig {
                overlap_proportion: proportion,
                excluded_types: exclude.into_iter().collect(),
                replacement,
            };
            cmd_eval_events(&pred, &gold, &config, json)
        }
        Commands::EvalSpans {
            pred,
            gold,
            proportion,
            entity_metrics,
            relation_metrics,
            json,
        } => {
            let config = SpanEvalConfig {
                overlap_proportion: proportion,
            };
            cmd_eval_spans(&pred, &gold, &config, &entity_metrics, &relation_metrics, json)
        }
        Commands::Project {
            corpus,
            schema,
            out,
        } => cmd_project(&corpus, &schema, out.as_deref()),
        Commands::Gold { corpus, out } => cmd_gold(&corpus, out.as_deref()),
        Commands::Schema { schema } => cmd_schema(&schema),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_schema(path: &Path) -> Result<Schema> {
    Schema::load(path).with_context(|| format!("loading event schema {}", path.display()))
}

/// `--out` file, or stdout.
fn output(out: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => Box::new(io::BufWriter::new(
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_resolve(args: &ResolveArgs) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let config = args.config()?;
    let sentences: Vec<SentenceAnnotation> = read_jsonl_file(&args.input)
        .with_context(|| format!("reading sentence annotations {}", args.input.display()))?;
    info!(sentences = sentences.len(), ?config, "resolving");

    let docs = resolve_documents(&schema, &config, sentences);
    let events: usize = docs.iter().map(|d| d.event.len()).sum();
    write_jsonl(output(args.out.as_deref())?, &docs).context("writing event documents")?;

    eprintln!(
        "{} {} documents, {} events",
        "Resolved".green().bold(),
        docs.len(),
        events
    );
    Ok(())
}

fn cmd_eval_events(pred: &Path, gold: &Path, config: &EventEvalConfig, json: bool) -> Result<()> {
    let pred_docs: Vec<DocumentEvents> = read_jsonl_file(pred)
        .with_context(|| format!("reading predicted events {}", pred.display()))?;
    let gold_docs: Vec<DocumentEvents> = read_jsonl_file(gold)
        .with_context(|| format!("reading gold events {}", gold.display()))?;

    let board = evaluate_events(&pred_docs, &gold_docs, config).context("scoring events")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        print_board("Event arguments", &board);
    }
    Ok(())
}

fn cmd_eval_spans(
    pred: &Path,
    gold: &Path,
    config: &SpanEvalConfig,
    entity_metrics: &[EntityMetric],
    relation_metrics: &[RelationMetric],
    json: bool,
) -> Result<()> {
    let pred_sents: Vec<SentenceAnnotation> = read_jsonl_file(pred)
        .with_context(|| format!("reading predicted sentences {}", pred.display()))?;
    let gold_sents: Vec<SentenceAnnotation> = read_jsonl_file(gold)
        .with_context(|| format!("reading gold sentences {}", gold.display()))?;

    let entity_metrics = if entity_metrics.is_empty() {
        &EntityMetric::ALL[..]
    } else {
        entity_metrics
    };
    let relation_metrics = if relation_metrics.is_empty() {
        &RelationMetric::ALL[..]
    } else {
        relation_metrics
    };

    let mut report = serde_json::Map::new();
    for &metric in entity_metrics {
        let board = evaluate_entities(&pred_sents, &gold_sents, metric, config)
            .with_context(|| format!("scoring entities ({metric})"))?;
        if json {
            report.insert(format!("entity_{metric}"), serde_json::to_value(&board)?);
        } else {
            print_board(&format!("Entities ({metric})"), &board);
        }
    }
    for &metric in relation_metrics {
        let board = evaluate_relations(&pred_sents, &gold_sents, metric)
            .with_context(|| format!("scoring relations ({metric})"))?;
        if json {
            report.insert(format!("relation_{metric}"), serde_json::to_value(&board)?);
        } else {
            print_board(&format!("Relations ({metric})"), &board);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn cmd_project(corpus: &Path, schema: &Path, out: Option<&Path>) -> Result<()> {
    let schema = load_schema(schema)?;
    let entries = load_corpus(corpus).with_context(|| format!("loading corpus {}", corpus.display()))?;
    let sentences = project_corpus(&schema, &entries);
    write_jsonl(output(out)?, &sentences).context("writing sentence annotations")?;

    eprintln!(
        "{} {} documents into {} sentences",
        "Projected".green().bold(),
        entries.len(),
        sentences.len()
    );
    Ok(())
}

fn cmd_gold(corpus: &Path, out: Option<&Path>) -> Result<()> {
    let entries = load_corpus(corpus).with_context(|| format!("loading corpus {}", corpus.display()))?;
    let docs = gold_corpus(&entries);
    write_jsonl(output(out)?, &docs).context("writing gold event documents")?;

    eprintln!("{} {} documents", "Converted".green().bold(), docs.len());
    Ok(())
}

fn cmd_schema(path: &Path) -> Result<()> {
    println!("{} {}", "Loading".green().bold(), path.display());
    let schema = load_schema(path)?;

    println!("  Event types: {}", schema.len());
    for (_, decl) in schema.events() {
        println!(
            "    {}: trigger {}, {} primary, {} roles, {} relations",
            decl.name.yellow(),
            decl.trigger_role().cyan(),
            decl.primary_args.len(),
            decl.args.len(),
            decl.event_relations.len()
        );
    }

    println!("{}", "Valid.".green());
    Ok(())
}

fn print_board(title: &str, board: &Scoreboard) {
    println!("{}", title.green().bold());
    print!("{board}");
}
