use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use ticket_trend::analyzer::{RunOptions, RunSummary, TicketTrendAnalyzer};
use ticket_trend::config::Config;
use ticket_trend::logging::init_logging;
use ticket_trend::repository::GitCli;
use ticket_trend::resolver::{CommitSelection, ResolverPolicy};
use ticket_trend::tracker::JiraClient;
use tracing::info;

#[derive(Parser)]
#[command(name = "ticket-trend")]
#[command(about = "Monthly fixed-ticket histogram from issue tracker and commit history")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, resolve, aggregate and write the CSV
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Tracker project key, e.g. FALCON
    #[arg(long)]
    project: Option<String>,
    /// Tracker base URL
    #[arg(long)]
    tracker_url: Option<String>,
    /// Issues requested per page (1-1000)
    #[arg(long)]
    page_size: Option<usize>,
    /// Local working copy of the project repository
    #[arg(long)]
    repo: Option<PathBuf>,
    /// Clone the repository from this URL if the working copy is missing
    #[arg(long)]
    clone_from: Option<String>,
    /// How commits are matched to issues
    #[arg(long, value_enum)]
    policy: Option<ResolverPolicy>,
    /// Which matching commit wins for per-issue search
    #[arg(long, value_enum)]
    selection: Option<CommitSelection>,
    /// Output CSV file
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            let json = args.json;
            match run(cli.config, args).await {
                Ok(()) => Ok(()),
                Err(e) => handle_error(e, json),
            }
        }
        Commands::Config => match show_config(cli.config) {
            Ok(()) => Ok(()),
            Err(e) => handle_error(e, false),
        },
    }
}

fn load_config(path: Option<PathBuf>, args: &RunArgs) -> Result<Config> {
    let mut config = Config::load(path.as_deref())?;

    if let Some(project) = &args.project {
        config.tracker.project = project.clone();
    }
    if let Some(url) = &args.tracker_url {
        config.tracker.base_url = url.clone();
    }
    if let Some(page_size) = args.page_size {
        config.tracker.page_size = page_size;
    }
    if let Some(repo) = &args.repo {
        config.repository.path = Some(repo.clone());
    }
    if let Some(url) = &args.clone_from {
        config.repository.remote_url = Some(url.clone());
    }
    if let Some(policy) = args.policy {
        config.resolver.policy = policy;
    }
    if let Some(selection) = args.selection {
        config.resolver.selection = selection;
    }
    if let Some(output) = &args.output {
        config.output.path = output.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn run(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let config = load_config(config_path, &args)?;
    let _log_guard = init_logging(&config.logging, &config.paths.log_directory);
    info!(
        project = %config.tracker.project,
        policy = %config.resolver.policy,
        output = %config.output.path.display(),
        "Configuration loaded"
    );

    let project = config.tracker.project.as_str();
    let tracker = JiraClient::new(&config.tracker)?;
    let git = GitCli::from_config(&config.repository, project);

    if config.resolver.policy.needs_repository() {
        git.ensure_working_copy(config.repository.remote_url.as_deref())
            .await
            .context("Repository unavailable")?;
    }

    let options = RunOptions {
        page_size: config.tracker.page_size,
        policy: config.resolver.policy,
        selection: config.resolver.selection,
        issue_prefix: config.repository.issue_prefix(project).to_string(),
        output_path: config.output.path.clone(),
    };

    let summary = TicketTrendAnalyzer::new(&tracker, &git, options).run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(project, &summary);
    }
    Ok(())
}

fn show_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_summary(project: &str, summary: &RunSummary) {
    println!(
        "✅ {} fixed {} tickets: wrote {} months to {}",
        project.bold(),
        summary.issues.to_string().green(),
        summary.months,
        summary.output.display().to_string().cyan()
    );

    if let (Some(first), Some(last)) = (summary.first_month, summary.last_month) {
        println!(
            "   {} → {} ({} dated by commits, {} by tracker, {} empty months)",
            first,
            last,
            summary.from_commits,
            summary.from_tracker,
            summary.gap_months
        );
    } else {
        println!("   {}", "No resolved issues found".yellow());
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
