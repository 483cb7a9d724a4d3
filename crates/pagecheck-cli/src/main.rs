use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pagecheck_cli::commands;
use pagecheck_cli::{OutputFormat, ProfileArg, Settings, StrategyArg};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagecheck")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Analyze web page quality with PageSpeed Insights",
    long_about = "pagecheck runs PageSpeed Insights analyses under a hard time budget, \
                  normalizes the report into scores, Core Web Vitals and improvements, \
                  and keeps a local cache, history and favorites list."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Analysis API endpoint
    #[arg(long, global = true, env = "PAGECHECK_ENDPOINT")]
    endpoint: Option<String>,

    /// API key appended to upstream requests
    #[arg(long, global = true, env = "PAGECHECK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Directory holding cache, history and favorites
    #[arg(long, global = true, env = "PAGECHECK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Retry profile
    #[arg(long, global = true, value_enum, env = "PAGECHECK_PROFILE", default_value = "standard")]
    profile: ProfileArg,

    /// Override the wall-clock budget of the retry profile, in seconds
    #[arg(long, global = true, env = "PAGECHECK_BUDGET_SECS")]
    budget: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a URL
    Analyze {
        /// URL to analyze; a bare host gets https://
        #[arg(value_name = "URL")]
        url: String,

        /// Device strategy
        #[arg(short, long, value_enum, default_value = "mobile")]
        strategy: StrategyArg,

        /// List every audit grouped by category
        #[arg(long)]
        all_audits: bool,
    },

    /// Inspect and manage analysis history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage bookmarked URLs
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Inspect or clear the report cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show the resolved configuration
    Config,

    /// Generate shell completion scripts
    #[command(after_help = "SUPPORTED SHELLS:\n  \
        bash, zsh, fish, powershell, elvish\n\n\
        INSTALLATION:\n  \
        bash:  pagecheck completion --shell bash >> ~/.bashrc\n  \
        zsh:   pagecheck completion --shell zsh > \"${fpath[1]}/_pagecheck\"\n  \
        fish:  pagecheck completion --shell fish > ~/.config/fish/completions/pagecheck.fish")]
    Completion {
        /// Target shell
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List past analyses, most recent first
    List {
        /// Only entries for this URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Counts over the last day, week and month
    Stats,
    /// Analyses grouped by day
    Timeline,
    /// Remove one entry
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Toggle the favorite flag of an entry
    Favorite {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites
    List,
    /// Bookmark a URL
    Add {
        #[arg(value_name = "URL")]
        url: String,
        /// Display name; defaults to the URL host
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove a bookmark
    Remove {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Change the display name of a bookmark
    Rename {
        #[arg(value_name = "URL")]
        url: String,
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Exit successfully only if the URL is a favorite
    Check {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Number of cached reports
    Size,
    /// Remove every cached report
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Commands::Completion { shell } = cli.command {
        return commands::completion::execute(shell, &mut Cli::command());
    }

    let settings = Settings::resolve(
        cli.endpoint.as_deref(),
        cli.api_key,
        cli.data_dir,
        cli.profile.into(),
        cli.budget,
    )?;
    let format = cli.format;

    match cli.command {
        Commands::Analyze {
            url,
            strategy,
            all_audits,
        } => commands::analyze::execute(&settings, &url, strategy.into(), all_audits, format),
        Commands::History { action } => match action {
            HistoryAction::List { url } => commands::history::list(&settings, url.as_deref(), format),
            HistoryAction::Stats => commands::history::stats(&settings, format),
            HistoryAction::Timeline => commands::history::timeline(&settings, format),
            HistoryAction::Remove { id } => commands::history::remove(&settings, &id),
            HistoryAction::Favorite { id } => commands::history::favorite(&settings, &id),
            HistoryAction::Clear => commands::history::clear(&settings),
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(&settings, format),
            FavoritesAction::Add { url, name } => {
                commands::favorites::add(&settings, &url, name.as_deref())
            }
            FavoritesAction::Remove { url } => commands::favorites::remove(&settings, &url),
            FavoritesAction::Rename { url, name } => {
                commands::favorites::rename(&settings, &url, &name)
            }
            FavoritesAction::Check { url } => {
                if !commands::favorites::check(&settings, &url)? {
                    std::process::exit(1);
                }
                Ok(())
            }
        },
        Commands::Cache { action } => match action {
            CacheAction::Size => commands::cache::size(&settings, format),
            CacheAction::Clear => commands::cache::clear(&settings),
        },
        Commands::Config => commands::config::execute(&settings, format),
        Commands::Completion { .. } => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "pagecheck=debug,pagecheck_cli=debug,pagecheck_core=debug,pagecheck_client=debug,pagecheck_store=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagecheck=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
