use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use occupancy_cli::cli::commands;
use occupancy_cli::client::hub::DEFAULT_HUB_ENDPOINT;
use occupancy_cli::client::webdriver::{DEFAULT_PAGE_URL, DEFAULT_WEBDRIVER_URL};
use occupancy_cli::client::FetchOptions;
use occupancy_cli::monitor::MonitorOptions;

#[derive(Parser)]
#[command(name = "occupancy")]
#[command(author, version, about = "Library occupancy monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// WebDriver endpoint driving the headless browser
    #[arg(long, global = true, env = "WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
    webdriver_url: String,

    /// Occupancy page to scrape
    #[arg(long, global = true, env = "OCCUPANCY_PAGE_URL", default_value = DEFAULT_PAGE_URL)]
    page_url: String,

    /// Directory holding the local history mirror
    #[arg(long, global = true, env = "OCCUPANCY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seconds to wait for client-side rendering after navigation
    #[arg(long, global = true, default_value = "10")]
    settle_secs: u64,

    /// Page navigation timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    page_timeout_secs: u64,
}

impl Cli {
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_url: self.page_url.clone(),
            page_load_timeout: Duration::from_secs(self.page_timeout_secs),
            settle_delay: Duration::from_secs(self.settle_secs),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the measurement loop
    Run {
        /// Execute a single round and exit
        #[arg(long)]
        once: bool,

        /// Seconds between rounds
        #[arg(long, default_value = "180")]
        round_delay_secs: u64,

        /// Seconds between attempts within a round
        #[arg(long, default_value = "60")]
        retry_delay_secs: u64,

        /// Attempts per round
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Successful readings between dataset pushes
        #[arg(long, default_value = "10")]
        push_every: u32,

        /// Realtime database URL for the live sink
        #[arg(long, env = "FIREBASE_DATABASE_URL")]
        database_url: String,

        /// Realtime database secret
        #[arg(long, env = "FIREBASE_AUTH", hide_env_values = true)]
        firebase_auth: Option<String>,

        /// Dataset repository receiving history pushes
        #[arg(long, env = "HF_DATASET_REPO", default_value = "davnas/occupancy_perc")]
        repo: String,

        /// Dataset hub access token
        #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
        hub_token: Option<String>,

        /// Dataset hub endpoint
        #[arg(long, env = "HF_ENDPOINT", default_value = DEFAULT_HUB_ENDPOINT)]
        hub_endpoint: String,
    },
    /// Fetch and parse the page once, without touching any store
    Fetch {
        /// Print the unparsed body text
        #[arg(long)]
        raw: bool,
    },
    /// Push the locally mirrored history to the dataset repository
    Push {
        /// Dataset repository receiving the push
        #[arg(long, env = "HF_DATASET_REPO", default_value = "davnas/occupancy_perc")]
        repo: String,

        /// Dataset hub access token
        #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
        hub_token: Option<String>,

        /// Dataset hub endpoint
        #[arg(long, env = "HF_ENDPOINT", default_value = DEFAULT_HUB_ENDPOINT)]
        hub_endpoint: String,
    },
    /// Show the state of the local history mirror
    Status,
}

#[tokio::main]
async fn main() -> occupancy_cli::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let fetch_options = cli.fetch_options();

    let result = match cli.command {
        Commands::Run {
            once,
            round_delay_secs,
            retry_delay_secs,
            max_attempts,
            push_every,
            database_url,
            firebase_auth,
            repo,
            hub_token,
            hub_endpoint,
        } => {
            let options = MonitorOptions {
                max_attempts,
                retry_delay: Duration::from_secs(retry_delay_secs),
                round_delay: Duration::from_secs(round_delay_secs),
                push_every,
            };
            commands::run(
                cli.webdriver_url,
                fetch_options,
                database_url,
                firebase_auth,
                hub_endpoint,
                repo,
                hub_token,
                cli.data_dir,
                options,
                once,
            )
            .await
        }
        Commands::Fetch { raw } => commands::fetch(cli.webdriver_url, fetch_options, raw).await,
        Commands::Push {
            repo,
            hub_token,
            hub_endpoint,
        } => commands::push(hub_endpoint, repo, hub_token, cli.data_dir).await,
        Commands::Status => commands::status(cli.data_dir).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", occupancy_cli::error::format_user_error(&e));
        std::process::exit(1);
    }

    Ok(())
}
