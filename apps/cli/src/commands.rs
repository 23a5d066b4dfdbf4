//! CLI command definitions, routing, and tracing setup.

use std::str::FromStr;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use draftmill_core::pipeline::{GenerationConfig, GenerationOutcome, ProgressReporter};
use draftmill_provider::{HttpContentIndex, HttpGenerationProvider};
use draftmill_shared::{
    AppConfig, JobId, init_config, load_config, resolve_db_path, service_api_key,
    validate_api_key,
};
use draftmill_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Draftmill — generated prose in, publish-ready documents out.
#[derive(Parser)]
#[command(
    name = "draftmill",
    version,
    about = "Turn AI-generated prose into structured, publish-ready CMS documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create a generation job and run it to completion.
    Run {
        /// Subject the document should cover.
        subject: String,

        /// Content-index identifier holding the source material.
        #[arg(short, long)]
        index_id: String,
    },

    /// Show one job's status, progress, and result.
    Status {
        /// Job identifier.
        job_id: String,

        /// Emit the raw job record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List all generation jobs.
    List,

    /// List produced documents.
    Docs,

    /// Author management.
    Author {
        /// Author subcommand.
        #[command(subcommand)]
        action: AuthorAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Author subcommands.
#[derive(Subcommand)]
pub(crate) enum AuthorAction {
    /// Add an author to the local store.
    Add {
        /// Display name.
        name: String,

        /// Attribution role (jobs attribute documents to the default role).
        #[arg(short, long, default_value = "author")]
        role: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "draftmill=info",
        1 => "draftmill=debug",
        _ => "draftmill=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { subject, index_id } => cmd_run(&subject, &index_id).await,
        Command::Status { job_id, json } => cmd_status(&job_id, json).await,
        Command::List => cmd_list().await,
        Command::Docs => cmd_docs().await,
        Command::Author { action } => match action {
            AuthorAction::Add { name, role } => cmd_author_add(&name, &role).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Open the configured local store.
async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let db_path = resolve_db_path(config)?;
    Ok(Storage::open(&db_path).await?)
}

async fn cmd_run(subject: &str, index_id: &str) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;

    let storage = open_storage(&config).await?;
    let api_key = service_api_key(&config);
    let index = HttpContentIndex::new(&config.service.base_url, api_key.clone())?;
    let provider = HttpGenerationProvider::new(&config.service.base_url, api_key)?;
    let gen_config = GenerationConfig::from(&config);

    let job = storage.insert_job(subject, index_id).await?;

    info!(
        job_id = %job.id,
        subject,
        index_id,
        "starting generation job"
    );

    // Set up progress reporting
    let reporter = CliProgress::new();

    let outcome = draftmill_core::pipeline::run_generation_job(
        &job.id,
        &gen_config,
        &index,
        &provider,
        &storage,
        &reporter,
    )
    .await
    .map_err(|failure| {
        if let Some(secondary) = &failure.record_failure {
            eprintln!("warning: could not record the job error: {secondary}");
        }
        eyre!("{}", failure.error)
    })?;

    // Print summary
    println!();
    println!("  Document generated successfully!");
    println!("  Job:    {}", job.id);
    println!("  Doc:    {}", outcome.document_id);
    println!("  Title:  {}", outcome.title);
    println!("  Slug:   {}", outcome.slug);
    println!("  Time:   {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_status(job_id: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let id = JobId::from_str(job_id).map_err(|e| eyre!("invalid job id '{job_id}': {e}"))?;
    let job = storage
        .get_job(&id)
        .await?
        .ok_or_else(|| eyre!("no job found with id '{job_id}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    println!("  Job:      {}", job.id);
    println!("  Subject:  {}", job.subject_title);
    println!("  Index:    {}", job.index_id);
    println!("  Status:   {}", job.status);
    if let Some(progress) = &job.progress {
        println!("  Progress: {progress}");
    }
    if let Some(error) = &job.error {
        println!("  Error:    {error}");
    }
    if let Some(document_id) = &job.document_id {
        println!("  Document: {document_id}");
        if let Some(doc) = storage.get_document(document_id).await? {
            println!("  Title:    {}", doc.title);
            println!("  Slug:     {}", doc.slug);
        }
    }

    Ok(())
}

async fn cmd_list() -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let jobs = storage.list_jobs().await?;
    if jobs.is_empty() {
        println!("No generation jobs yet. Create one with `draftmill run`.");
        return Ok(());
    }

    for job in jobs {
        println!(
            "  {}  {:<10}  {}",
            job.id,
            job.status.to_string(),
            job.subject_title
        );
    }

    Ok(())
}

async fn cmd_docs() -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let docs = storage.list_documents().await?;
    if docs.is_empty() {
        println!("No documents yet.");
        return Ok(());
    }

    for doc in docs {
        println!("  {}  {}", doc.id, doc.slug);
        println!("      {}", doc.title);
        let preview: String = doc.excerpt.chars().take(72).collect();
        if !preview.is_empty() {
            println!("      {preview}…");
        }
    }

    Ok(())
}

async fn cmd_author_add(name: &str, role: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let author = storage.insert_author(name, role).await?;
    println!("Added author '{}' ({}) with role '{}'.", author.name, author.id, author.role);

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn indexing(&self, remaining: u64, attempt: u32) {
        self.spinner.set_message(format!(
            "Waiting for indexing [attempt {attempt}]: {remaining} items remaining"
        ));
    }

    fn done(&self, _outcome: &GenerationOutcome) {
        self.spinner.finish_and_clear();
    }
}
