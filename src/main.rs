use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use placescope::config::{self, RunConfig};
use placescope::error::ScrapeError;
use placescope::lexicon::Language;
use placescope::pipeline;
use placescope::webdriver::{BrowserArg, WebDriverOptions, WebDriverSession};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "placescope",
    version,
    about = "Harvest a map listing's place details and reviews into CSV files"
)]
struct Cli {
    /// Listing URL; prompted for when omitted.
    #[arg(value_name = "URL")]
    url: Option<String>,

    #[arg(long, value_name = "N")]
    max_reviews: Option<usize>,

    #[arg(long, value_name = "PATH")]
    output_root: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Language::Tr)]
    language: Language,

    #[arg(long, value_name = "URL", default_value = "http://localhost:4444")]
    webdriver_url: String,

    #[arg(long, value_enum, default_value_t = BrowserArg::Chrome)]
    webdriver_browser: BrowserArg,

    #[arg(long, default_value_t = false)]
    webdriver_headless: bool,

    #[arg(long, value_name = "PATH")]
    webdriver_binary: Option<String>,

    #[arg(long, default_value_t = false)]
    no_webdriver_autostart: bool,

    #[arg(long, value_name = "MS", default_value_t = 12000)]
    webdriver_start_timeout_ms: u64,

    #[arg(long, value_name = "MS", default_value_t = 5000)]
    settle_ms: u64,

    /// Also write sonuc.json next to the CSV files.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn webdriver_options(&self) -> WebDriverOptions {
        WebDriverOptions {
            endpoint: self.webdriver_url.clone(),
            browser: self.webdriver_browser,
            headless: self.webdriver_headless,
            binary: self.webdriver_binary.clone(),
            autostart: !self.no_webdriver_autostart,
            start_timeout_ms: self.webdriver_start_timeout_ms,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "placescope=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn prompt(question: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{question}")?;
    stdout.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// URL and review count, prompting for whatever the command line left out.
fn resolve_inputs(cli: &Cli) -> Result<(String, usize), ScrapeError> {
    let (url, prompted) = match &cli.url {
        Some(url) => (url.trim().to_string(), false),
        None => (prompt("Google Maps URL: ")?, true),
    };
    if url.is_empty() {
        return Err(ScrapeError::InvalidInput("no URL given".to_string()));
    }
    let max_reviews = match cli.max_reviews {
        Some(n) if n > 0 => n,
        Some(_) => config::DEFAULT_MAX_REVIEWS,
        None if prompted => {
            config::parse_max_reviews(&prompt("Maximum reviews (default 200): ")?)
        }
        None => config::DEFAULT_MAX_REVIEWS,
    };
    Ok((url, max_reviews))
}

async fn run(cli: Cli) -> Result<(), ScrapeError> {
    let (url, max_reviews) = resolve_inputs(&cli)?;
    let output_root = cli.output_root.clone().unwrap_or_else(config::default_output_root);

    let mut run_config = RunConfig::new(url, max_reviews, output_root);
    run_config.language = cli.language;
    run_config.write_json = cli.json;
    run_config.pacing = run_config
        .pacing
        .clone()
        .with_settle(Duration::from_millis(cli.settle_ms));

    let mut session = WebDriverSession::connect(&cli.webdriver_options()).await?;
    let result = pipeline::run(&mut session, &run_config).await;
    session.close().await;

    let report = result?;
    info!(
        dir = %report.output_dir.display(),
        place = %report.place.name,
        reviews = report.reviews.collected,
        "done"
    );
    println!("{}", report.output_dir.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}
