//! # BioAgentLab
//!
//! Answers drug-target validation questions by letting a language model call
//! PubMed, UniProt, ClinicalTrials.gov and a local literature index.
//!
//! Usage:
//!   bioagentlab                                   # run the built-in example query
//!   bioagentlab "Is KRAS G12C druggable?"         # custom query
//!   bioagentlab --no-index -v "CD47 in AML"       # skip the local index, print the trace

use std::path::PathBuf;
use std::process::ExitCode;

use bal_ai::agent::AnswerTrace;
use bal_ai::orchestrator::{AgentOptions, BioAgent};
use bal_ai::prompts::DEFAULT_TEMPLATE;
use bal_core::config::AppConfig;
use bal_core::error::AppError;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXAMPLE_QUERY: &str = "Is CD47 a valid cancer immunotherapy target in solid tumors, and what are the regulatory hurdles in the EU?";

#[derive(Parser)]
#[command(
    name = "bioagentlab",
    version,
    about = "Biomedical research assistant for drug-target validation"
)]
struct Cli {
    /// Question to answer
    #[arg(default_value = EXAMPLE_QUERY)]
    query: String,

    /// Directory of *.txt documents for the local index (overrides BAL_CORPUS_DIR)
    #[arg(long)]
    corpus_dir: Option<PathBuf>,

    /// Upper bound on reasoning steps (overrides BAL_MAX_ITERATIONS)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Chunks returned per local index lookup (overrides BAL_TOP_K)
    #[arg(long)]
    top_k: Option<usize>,

    /// Prompt template name
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: String,

    /// Do not build or offer the local index tool
    #[arg(long)]
    no_index: bool,

    /// Print every tool step after the answer
    #[arg(short, long)]
    verbose: bool,

    /// Print the full answer trace as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bioagentlab=info,bal_ai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.code, retryable = e.retryable, "query failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    // Credentials are checked here, before anything touches the network.
    let mut cfg = AppConfig::from_env()?;
    if let Some(dir) = &cli.corpus_dir {
        cfg.corpus_dir = dir.clone();
    }
    if let Some(n) = cli.max_iterations {
        cfg.max_iterations = n;
    }
    if let Some(k) = cli.top_k {
        cfg.top_k = k;
    }
    cfg.validate()?;

    let opts = AgentOptions {
        template: cli.template.clone(),
        use_index: !cli.no_index,
    };
    let agent = BioAgent::from_config(&cfg, &opts)?;

    if !cli.json {
        println!("\n[User Query]: {}", cli.query);
    }
    let trace = agent.run(&cli.query)?;

    if cli.json {
        let out = serde_json::to_string_pretty(&trace).map_err(|e| {
            AppError::new("OUTPUT_FAILED", "Failed to encode answer trace").with_details(e.to_string())
        })?;
        println!("{out}");
        return Ok(());
    }

    println!("\n[Agent Output]:\n {}", trace.answer);
    if cli.verbose {
        print_steps(&trace);
    }
    Ok(())
}

fn print_steps(trace: &AnswerTrace) {
    println!("\n[Trace]: {} step(s)", trace.steps.len());
    for (i, step) in trace.steps.iter().enumerate() {
        println!("\n--- step {} ---", i + 1);
        println!("Action: {}", step.tool);
        println!("Action Input: {}", step.tool_input);
        println!("Observation:\n{}", step.observation);
    }
}
