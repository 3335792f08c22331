//! # Repository Lens CLI (`lens`)
//!
//! The `lens` binary explores a repository once per invocation and then
//! searches, answers questions or prints statistics from that session.
//!
//! ## Usage
//!
//! ```bash
//! lens --config ./config/lens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lens explore` | Explore the repository and print statistics |
//! | `lens search "<query>"` | Print ranked knowledge entries |
//! | `lens ask "<question>"` | Print a synthesized answer with references |
//! | `lens chat` | Answer questions read line by line from stdin |
//! | `lens stats` | Print the session statistics table |
//! | `lens completions <shell>` | Print shell completions |
//!
//! Without a config file (or with `provider = "none"`) every command runs
//! against the built-in fallback dataset.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use repo_lens::answer::Synthesizer;
use repo_lens::config::{self, Config};
use repo_lens::explorer::{ExploreReport, Explorer};
use repo_lens::fetcher::create_fetcher;
use repo_lens::generation::{create_generator, Generator};
use repo_lens::history::{create_history, HistoryProvider};
use repo_lens::models::{Answer, RepoCoordinate};
use repo_lens::progress::ProgressMode;
use repo_lens::session::KnowledgeSession;
use repo_lens::stats::render_stats;

/// Repository Lens CLI: question answering over an unknown repository.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lens.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lens",
    about = "Repository Lens: ask natural-language questions about a source repository",
    version,
    long_about = "Repository Lens explores a repository through its hosting API or a local checkout, \
    extracts comments, functions, exports, routes and jobs into an in-memory knowledge store, and \
    answers questions by keyword retrieval with optional model-assisted synthesis."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lens.toml`. When the file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/lens.toml")]
    config: PathBuf,

    /// Exploration progress on stderr: off, human or json.
    ///
    /// Defaults to human when stderr is a terminal, otherwise off.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the repository and print what was learned.
    Explore,

    /// Search the knowledge store.
    ///
    /// Entries are ranked by the share of query keywords they contain.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to print (default: `retrieval.search_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question about the repository.
    Ask {
        /// The question.
        question: String,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive question loop over one session.
    ///
    /// Reads one question per line from stdin. `:refresh` re-explores the
    /// repository, `:stats` prints statistics and `:quit` exits.
    Chat,

    /// Print session statistics.
    Stats,

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Everything one invocation works with.
struct Workspace {
    config: Config,
    explorer: Option<Explorer>,
    repo: RepoCoordinate,
    generator: Box<dyn Generator>,
    history: Option<Box<dyn HistoryProvider>>,
    session: KnowledgeSession,
}

impl Workspace {
    fn open(config: Config, progress: ProgressMode) -> Result<Self> {
        let explorer = match create_fetcher(&config.repository)? {
            Some(fetcher) => Some(
                Explorer::new(fetcher, &config.explorer)?.with_reporter(progress.reporter()),
            ),
            None => None,
        };
        let history = if config.session.enrich_history {
            create_history(&config.repository)?
        } else {
            None
        };
        Ok(Self {
            repo: config.repository.coordinate(),
            generator: create_generator(&config.generation)?,
            explorer,
            history,
            session: KnowledgeSession::new(),
            config,
        })
    }

    fn source(&self) -> String {
        match &self.explorer {
            Some(explorer) => format!("{} ({})", self.repo, explorer.fetcher_name()),
            None => "built-in fallback dataset".to_string(),
        }
    }

    /// Refresh the session and explore the repository, if one is configured.
    async fn load(&mut self) -> Option<ExploreReport> {
        let seed_fallback = self.config.session.seed_fallback;
        let Some(explorer) = &self.explorer else {
            self.session.refresh();
            if seed_fallback {
                self.session.seed_fallback();
            }
            return None;
        };

        let report = self
            .session
            .load_repository(explorer, &self.repo, seed_fallback)
            .await;
        if let Some(history) = &self.history {
            let enriched = self.session.enrich_history(history.as_ref()).await;
            tracing::debug!(enriched, "history enrichment finished");
        }
        Some(report)
    }

    async fn ask(&self, question: &str) -> Answer {
        Synthesizer::new(self.generator.as_ref(), &self.config.retrieval)
            .answer(&self.session, question)
            .await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "lens", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_or_default(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
    let mut ws = Workspace::open(cfg, progress)?;
    let report = ws.load().await;

    match cli.command {
        Commands::Explore | Commands::Stats => {
            print!("{}", render_stats(&ws.session, &ws.source(), report.as_ref()));
        }
        Commands::Search { query, limit, json } => {
            run_search(&ws, &query, limit, json)?;
        }
        Commands::Ask { question, json } => {
            let answer = ws.ask(&question).await;
            print_answer(&answer, json)?;
        }
        Commands::Chat => {
            run_chat(&mut ws).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn run_search(ws: &Workspace, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let limit = limit.unwrap_or(ws.config.retrieval.search_limit);
    let hits = ws.session.search(query, ws.config.retrieval.min_score);

    if json {
        let results: Vec<serde_json::Value> = hits
            .iter()
            .take(limit)
            .map(|h| serde_json::json!({ "score": h.score, "entry": h.entry }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().take(limit).enumerate() {
        println!(
            "{}. [{:.2}] {} ({})",
            i + 1,
            hit.score,
            hit.entry.file_path,
            hit.entry.entry_type
        );
        let first_line = hit.entry.content.lines().next().unwrap_or("");
        let shown: String = first_line.chars().take(120).collect();
        println!("    {}", shown);
    }
    if hits.len() > limit {
        println!();
        println!("{} more results not shown (use --limit).", hits.len() - limit);
    }
    Ok(())
}

fn print_answer(answer: &Answer, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(answer)?);
        return Ok(());
    }

    println!("{}", answer.text);
    println!();
    println!("Confidence: {:.0}%", answer.confidence * 100.0);

    if !answer.references.is_empty() {
        println!();
        println!("References:");
        for r in &answer.references {
            match r.line_numbers {
                Some((start, end)) => println!("  - {}:{}-{}", r.file_path, start, end),
                None => println!("  - {}", r.file_path),
            }
        }
    }

    if let Some(ref visual) = answer.visual_context {
        println!();
        println!("Diagram:");
        println!("```mermaid");
        println!("{}", visual.syntax);
        println!("```");
    }

    if let Some(ref warning) = answer.warning {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

async fn run_chat(ws: &mut Workspace) -> Result<()> {
    eprintln!(
        "Session ready for {}. Ask a question, or :stats, :refresh, :quit.",
        ws.source()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" | ":exit" => break,
            ":stats" => {
                print!("{}", render_stats(&ws.session, &ws.source(), None));
            }
            ":refresh" => {
                let report = ws.load().await;
                print!("{}", render_stats(&ws.session, &ws.source(), report.as_ref()));
            }
            question => {
                let answer = ws.ask(question).await;
                print_answer(&answer, false)?;
                println!();
            }
        }
    }
    Ok(())
}
