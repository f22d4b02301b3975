use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use oxidized_dx::{
    agents::{prompt, DiagnosisHits, SearchProgress},
    config::Config,
    llm::provider::{LLMProviderConfig, LLM},
    models::FetchField,
    search::EntrezClient,
    utils::{init_logger, pacing::FixedIntervalPacer},
    DiagnosisPipeline, FetchOutcome,
};

/// Suggest diagnoses from a patient history and collect matching PubMed records
#[derive(Debug, Parser)]
#[command(name = "oxidized-dx", version, about)]
struct Cli {
    /// Patient history file (defaults to PATIENT_HISTORY_PATH or history.md)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Field to fetch: pmid, title or abstract. Asked interactively when omitted
    #[arg(long)]
    field: Option<String>,

    /// PubMed results per diagnosis (defaults to SEARCH_MAX_RESULTS or 10)
    #[arg(long)]
    max_results: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    // Load configuration; fails before any network call without a credential
    let config = Config::from_env()?;
    info!(model = %config.llm.model, "Configuration loaded");

    let llm = LLM::new(LLMProviderConfig::from(&config.llm))?;
    info!(provider = llm.provider_name(), "LLM client ready");
    let entrez = EntrezClient::from_config(&config.search);
    let pacer = FixedIntervalPacer::default();

    let history_path = cli.history.unwrap_or(config.prompt.history_path);
    let max_results = cli.max_results.unwrap_or(config.search.max_results);

    let prefix = prompt::assemble(&history_path).await?;

    let pipeline = DiagnosisPipeline::new(&llm, &entrez, &pacer, config.llm.model.clone())
        .with_max_results(max_results)
        .with_progress(&ConsoleProgress);

    let outcome = pipeline.search(&prefix).await?;
    println!("Total unique results: {}", outcome.unique_ids.len());

    let field = match cli.field {
        Some(field) => field,
        None => prompt_for_field()?,
    };
    println!("Fetching {} for unique results...", field.trim().to_lowercase());

    match pipeline.fetch(&outcome.unique_ids, &field).await {
        FetchOutcome::Rendered(details) => {
            if details.field() == FetchField::Pmid {
                println!("PMIDs:");
            }
            print!("{}", details.render());
            io::stdout().flush()?;
        }
        FetchOutcome::Rejected(message) => println!("{}", message),
        FetchOutcome::Failed(cause) => println!("Error fetching details: {}", cause),
    }

    Ok(())
}

/// Prints search progress to stdout as each query completes
struct ConsoleProgress;

impl SearchProgress for ConsoleProgress {
    fn diagnoses_extracted(&self, diagnoses: &[String]) {
        println!(
            "Relevant search parameters based on medical history: {:?}",
            diagnoses
        );
    }

    fn searching(&self, diagnosis: &str) {
        println!("Searching PubMed for: {}", diagnosis);
    }

    fn searched(&self, hits: &DiagnosisHits) {
        match &hits.error {
            Some(cause) => println!(
                "Error during PubMed search for '{}': {}",
                hits.diagnosis, cause
            ),
            None if hits.ids.is_empty() => println!("No results found for '{}'", hits.diagnosis),
            None => println!("Found {} results for '{}'", hits.ids.len(), hits.diagnosis),
        }
    }
}

/// Read the field selector from stdin
fn prompt_for_field() -> io::Result<String> {
    print!("Enter the field(s) to fetch (pmid/title/abstract): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_lowercase())
}
