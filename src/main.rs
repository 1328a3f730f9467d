use anyhow::Result;
use clap::Parser;
use fitplan::commands::{self, ClientOptions, DEFAULT_API_URL, DEFAULT_BIND};
use fitplan::http::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// fitplan - personalized workout plans
///
/// Runs the backend that proxies the plan, quote and image providers, or calls
/// that backend the way the mobile app does.
///
/// Provider keys are read from OPENAI_API_KEY, QUOTES_API_KEY and
/// UNSPLASH_ACCESS_KEY when serving.
///
/// Examples:
///   fitplan serve --bind 0.0.0.0:8888
///   fitplan plan --input profile.json
///   fitplan --api-url https://example.netlify.app/.netlify/functions/api quote
#[derive(Parser, Debug)]
#[command(author, version = env!("FITPLAN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (also via FITPLAN_API_URL)
    #[arg(
        long = "api-url",
        env = "FITPLAN_API_URL",
        value_name = "URL",
        default_value = DEFAULT_API_URL,
        global = true
    )]
    pub api_url: String,

    /// Attempts per request before giving up
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_ATTEMPTS, global = true)]
    pub attempts: u32,

    /// Per-attempt timeout in seconds
    #[arg(long = "timeout-secs", value_name = "S", default_value_t = DEFAULT_TIMEOUT.as_secs(), global = true)]
    pub timeout_secs: u64,

    /// Backoff unit in milliseconds; the wait after attempt i is (i + 1) units
    #[arg(long = "base-delay-ms", value_name = "MS", default_value_t = 1000, global = true)]
    pub base_delay_ms: u64,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the backend
    Serve(ServeArgs),

    /// Request a workout plan for a demographic profile
    Plan(PlanArgs),

    /// Fetch a motivational quote
    Quote,

    /// Fetch a motivational image
    Image,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (also via FITPLAN_BIND)
    #[arg(long, env = "FITPLAN_BIND", value_name = "ADDR", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,
}

#[derive(clap::Args, Debug)]
pub struct PlanArgs {
    /// Profile JSON file, or - for stdin
    #[arg(long, short = 'i', value_name = "FILE")]
    pub input: PathBuf,
}

impl Cli {
    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_url: self.api_url.clone(),
            attempts: self.attempts,
            timeout: Duration::from_secs(self.timeout_secs),
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::describe_failure(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let runtime = fitplan::runtime::RealRuntime;
    let options = cli.client_options();

    match cli.command {
        Commands::Serve(args) => commands::serve(runtime, args.bind).await,
        Commands::Plan(args) => commands::plan(&runtime, &options, &args.input).await,
        Commands::Quote => commands::quote(&options).await,
        Commands::Image => commands::image(&options).await,
    }
}
