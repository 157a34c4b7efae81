//! docsearch CLI - command line interface for a docsearch service.

use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docsearch_client::{
    Client, ClientConfig, SearchQuery, Task, TaskFilter, TaskRecord, TaskStatus, TaskUid,
    WaitOptions,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// docsearch CLI - index, search and task management tool
#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "CLI for a docsearch service", long_about = None)]
struct Cli {
    /// Service address
    #[arg(short, long, env = "DOCSEARCH_URL", default_value = "http://localhost:7700")]
    url: String,

    /// API key sent as a bearer token
    #[arg(short = 'k', long, env = "DOCSEARCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Compile a JSON filter description and print the expression
    Filter {
        /// Filter description, e.g. '{"rating": {"gte": 3}}'
        json: String,
    },

    /// Search an index
    Search {
        /// Index uid
        index: String,

        /// Query string
        #[arg(default_value = "")]
        query: String,

        /// Filter description as JSON
        #[arg(short, long)]
        filter: Option<String>,

        /// Maximum number of hits
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Add documents from a JSON array file
    #[command(name = "add-documents")]
    AddDocuments {
        /// Index uid
        index: String,

        /// Path to a file holding a JSON array of documents
        file: String,

        /// Primary key attribute
        #[arg(short, long)]
        primary_key: Option<String>,

        /// Wait for the indexing task to finish
        #[arg(short, long)]
        wait: bool,
    },

    /// Check service health
    Health,

    /// Show service version
    Version,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Show a task
    Get {
        /// Task uid
        uid: u64,
    },

    /// Wait for a task to finish
    Wait {
        /// Task uid
        uid: u64,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Cancel a task
    Cancel {
        /// Task uid
        uid: u64,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Delete a finished task
    Delete {
        /// Task uid
        uid: u64,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// List tasks
    List {
        /// Only tasks with these statuses (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        status: Vec<String>,

        /// Only tasks on these indexes (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        index: Vec<String>,

        /// Maximum number of tasks
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

#[derive(clap::Args)]
struct WaitArgs {
    /// Total time to wait, in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Pause between polls, in milliseconds
    #[arg(long, default_value = "50")]
    interval_ms: u64,
}

impl WaitArgs {
    fn options(&self) -> WaitOptions {
        WaitOptions::new(
            Duration::from_millis(self.timeout_ms),
            Duration::from_millis(self.interval_ms),
        )
    }
}

#[tokio::main]
async fn main() -> CliResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Filter compilation needs no service.
    if let Commands::Filter { json } = &cli.command {
        return compile_filter(json);
    }

    let mut config = ClientConfig::new(cli.url).with_client_agent("docsearch-cli");
    if let Some(key) = cli.api_key {
        config = config.with_api_key(key);
    }
    let client = Client::new(config)?;

    match cli.command {
        Commands::Task { command } => run_task_command(&client, command).await?,
        Commands::Filter { .. } => {}
        Commands::Search {
            index,
            query,
            filter,
            limit,
        } => search(&client, index, query, filter, limit).await?,
        Commands::AddDocuments {
            index,
            file,
            primary_key,
            wait,
        } => add_documents(&client, index, file, primary_key, wait).await?,
        Commands::Health => health(&client).await?,
        Commands::Version => version(&client).await?,
    }

    Ok(())
}

async fn run_task_command(client: &Client, command: TaskCommands) -> CliResult {
    match command {
        TaskCommands::Get { uid } => {
            let task = client.task(TaskUid::new(uid)).await?;
            print_record(task.record())?;
        }
        TaskCommands::Wait { uid, wait } => {
            let record = client.wait_for_task(TaskUid::new(uid), wait.options()).await?;
            print_record(&record)?;
        }
        TaskCommands::Cancel { uid, wait } => {
            let mut task = client.task(TaskUid::new(uid)).await?;
            if task.cancel(wait.options()).await? {
                println!("Task {uid} cancelled");
            } else {
                println!("Task {uid} could not be cancelled (status: {})", task.status());
            }
        }
        TaskCommands::Delete { uid, wait } => {
            let mut task = client.task(TaskUid::new(uid)).await?;
            if task.delete(wait.options()).await? {
                println!("Task {uid} deleted");
            } else {
                println!("Task {uid} was not deleted (status: {})", task.status());
            }
        }
        TaskCommands::List {
            status,
            index,
            limit,
        } => {
            let statuses = status
                .iter()
                .map(|s| s.parse::<TaskStatus>())
                .collect::<Result<Vec<_>, _>>()?;
            let filter = TaskFilter::default()
                .with_statuses(statuses)
                .with_index_uids(index)
                .with_limit(limit);
            let page = client.tasks().list(&filter).await?;
            print_task_table(&page.results);
        }
    }
    Ok(())
}

fn compile_filter(json: &str) -> CliResult {
    let description: Value = serde_json::from_str(json)?;
    println!("{}", docsearch_core::filter::build_value(&description)?);
    Ok(())
}

async fn search(
    client: &Client,
    index: String,
    query: String,
    filter: Option<String>,
    limit: Option<u32>,
) -> CliResult {
    let mut request = SearchQuery::new(query);
    if let Some(filter) = filter {
        let description: Value = serde_json::from_str(&filter)?;
        request = request.with_filter(&description)?;
        debug!(filter = ?request.filter, "Compiled search filter");
    }
    if let Some(limit) = limit {
        request = request.with_limit(limit);
    }

    let results = client.index(index).search::<Value>(&request).await?;

    println!(
        "{} hits ({} ms):",
        results.estimated_total_hits.unwrap_or(results.hits.len() as u64),
        results.processing_time_ms
    );
    for hit in &results.hits {
        println!("{}", serde_json::to_string(hit)?);
    }
    Ok(())
}

async fn add_documents(
    client: &Client,
    index: String,
    file: String,
    primary_key: Option<String>,
    wait: bool,
) -> CliResult {
    let contents = tokio::fs::read_to_string(&file).await?;
    let documents: Vec<Value> = serde_json::from_str(&contents)?;

    let mut task = client
        .index(index)
        .documents()
        .add(&documents, primary_key.as_deref())
        .await?;
    println!("Enqueued {} documents as task {}", documents.len(), task.uid());

    if wait {
        task.wait(client.wait_options()).await?;
        print_task_summary(&task);
    }
    Ok(())
}

async fn health(client: &Client) -> CliResult {
    let health = client.health().await?;
    println!("Status: {}", health.status);
    Ok(())
}

async fn version(client: &Client) -> CliResult {
    let version = client.version().await?;
    println!("Version:  {}", version.pkg_version);
    println!("Commit:   {}", version.commit_sha);
    println!("Date:     {}", version.commit_date);
    Ok(())
}

fn print_record(record: &TaskRecord) -> CliResult {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

fn print_task_summary(task: &Task) {
    println!("  UID:        {}", task.uid());
    println!("  Type:       {}", task.kind());
    println!("  Status:     {}", task.status());
    if let Some(error) = task.error() {
        println!("  Error:      {} ({})", error.message, error.code);
    }
}

fn print_task_table(records: &[TaskRecord]) {
    println!("Tasks ({}):", records.len());
    println!(
        "{:<8}  {:<10}  {:<28}  {:<16}  {}",
        "UID", "STATUS", "TYPE", "INDEX", "ENQUEUED"
    );
    println!("{}", "-".repeat(90));

    for record in records {
        println!(
            "{:<8}  {:<10}  {:<28}  {:<16}  {}",
            record.uid(),
            record.status(),
            record.kind(),
            record.index_uid().unwrap_or("-"),
            format_timestamp(record.enqueued_at())
        );
    }
}

fn format_timestamp(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
