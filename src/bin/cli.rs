//! Coverage admin CLI
//!
//! Terminal front end for the submission review desk.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use coverage_admin::{
    api::HttpReviewApi,
    auth::AuthContext,
    error::{AppError, Result},
    models::Config,
    services::{
        ActionOutcome, DataFetcher, DateFilter, PresetPrompt, ReviewController, ReviewPrompt,
        StatusFilter, SubmissionFilter, TerminalPrompt, export,
    },
    storage::LocalStore,
    utils::console,
};

/// Coverage admin - review desk for country coverage submissions
#[derive(Parser, Debug)]
#[command(
    name = "coverage-admin",
    version,
    about = "Review country coverage page submissions"
)]
struct Cli {
    /// Directory holding config.toml and the persisted session
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bearer token for this run only
    #[arg(long)]
    token: Option<String>,

    /// Dashboard API base URL, overriding the config file
    #[arg(long, env = "COVERAGE_API_BASE")]
    api_base: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Case-insensitive match on country name, slug or submitter name
    #[arg(long, default_value = "")]
    search: String,

    /// all, pending, approved or rejected
    #[arg(long, default_value = "all")]
    status: StatusFilter,

    /// all, today, week or month
    #[arg(long, default_value = "all")]
    date: DateFilter,

    /// Maximum submissions to load (default: api.submission_limit)
    #[arg(long)]
    limit: Option<usize>,
}

impl FilterArgs {
    fn criteria(&self) -> SubmissionFilter {
        SubmissionFilter::new(self.search.clone(), self.status, self.date)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Persist an admin token for later runs
    Login {
        #[arg(long)]
        token: String,
    },

    /// Forget the persisted token
    Logout,

    /// Show aggregate submission stats
    Stats,

    /// List submissions matching the filters
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one submission by id or slug
    Show { key: String },

    /// Approve a pending submission
    Approve { id: String },

    /// Reject a pending submission
    Reject {
        id: String,

        /// Rejection reason (asked interactively when omitted)
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a submission
    Delete {
        id: String,

        /// Skip the confirmation question
        #[arg(long)]
        yes: bool,
    },

    /// Export the filtered view as CSV
    Export {
        /// Output directory (default: export.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn prompt_for(command: &Command) -> Arc<dyn ReviewPrompt> {
    match command {
        Command::Reject { note: Some(note), .. } => {
            Arc::new(PresetPrompt::new(Some(note.clone()), false))
        }
        Command::Delete { yes: true, .. } => Arc::new(PresetPrompt::new(None, true)),
        _ => Arc::new(TerminalPrompt),
    }
}

fn report(outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Approved(s) => println!("Approved {} ({})", s.name, s.slug),
        ActionOutcome::Rejected(s) => println!("Rejected {} ({})", s.name, s.slug),
        ActionOutcome::Deleted(s) => println!("Deleted {} ({})", s.name, s.slug),
        ActionOutcome::Abandoned => println!("Nothing changed."),
    }
}

async fn run(cli: Cli, mut config: Config) -> Result<()> {
    if let Some(base) = cli.api_base.clone() {
        config.api.base_url = base;
    }

    let store = Arc::new(LocalStore::new(&cli.storage_dir));
    let auth = AuthContext::with_store(store).token(cli.token.clone());

    match &cli.command {
        Command::Login { token } => {
            auth.login(token).await?;
            log::info!("Token saved under {}", cli.storage_dir.display());
            return Ok(());
        }
        Command::Logout => {
            auth.logout().await?;
            log::info!("Token removed");
            return Ok(());
        }
        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (api: {})", config.api.base_url);
            return Ok(());
        }
        _ => {}
    }

    let api = Arc::new(HttpReviewApi::new(&config.api)?);
    let fetcher = DataFetcher::new(api, auth);
    let desk = ReviewController::new(fetcher, prompt_for(&cli.command));

    let limit = match &cli.command {
        Command::List { filter } | Command::Export { filter, .. } => filter.limit,
        _ => None,
    }
    .unwrap_or(config.api.submission_limit);
    desk.refresh(limit).await?;

    match cli.command {
        Command::Stats => {
            if let Some(snapshot) = desk.stats() {
                console::header("Country coverage submissions");
                print!("{}", console::render_stats(&snapshot));
            }
        }

        Command::List { filter } => {
            let criteria = filter.criteria();
            let rows = desk.visible(&criteria, &Local::now());
            console::header(&format!(
                "Submissions (search '{}', status {}, date {})",
                criteria.search, criteria.status, criteria.date
            ));
            print!("{}", console::render_table(&rows, desk.in_flight().as_deref()));
            console::separator();
            println!("{} of {} submissions", rows.len(), desk.submissions().len());
        }

        Command::Show { key } => {
            let submission = desk.find(&key).ok_or(AppError::NotFound(key))?;
            print!("{}", console::render_detail(&submission));
        }

        Command::Approve { id } => report(desk.approve(&id).await?),
        Command::Reject { id, .. } => report(desk.reject(&id).await?),
        Command::Delete { id, .. } => report(desk.remove(&id).await?),

        Command::Export { out, filter } => {
            let now = Local::now();
            let rows = desk.visible(&filter.criteria(), &now);
            let dir = out.unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
            let path = export::export_to_dir(&dir, &rows, now.date_naive())?;
            console::summary(
                "Export",
                &[
                    ("Rows", rows.len().to_string()),
                    ("File", path.display().to_string()),
                ],
            );
        }

        Command::Login { .. } | Command::Logout | Command::Validate => {}
    }

    desk.settle().await;
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let loaded = Config::load(&config_path);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            config_path.display(),
            e
        );
        Config::default()
    });

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Unauthorized) => {
            log::error!("Not authorized. Run `coverage-admin login --token <TOKEN>` and try again.");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
