//! Unified Crawler CLI
//!
//! Community board crawls, YouTube searches and license tooling.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use unified_crawler::{
    browser::{BrowserOptions, ChromeDriverLauncher, install_driver, resolve_driver_path},
    config::{Environment, load_config},
    error::{AppError, Result},
    export::Watermark,
    license::{LicenseStore, LicenseVerifier, SystemDeviceId},
    models::Site,
    pipeline::{self, IssueRequest, YoutubeJob},
    services::{CaptionRetriever, CrawlRequest, YtDlp, look_back},
};

/// Unified Crawler - Korean community and YouTube collector
#[derive(Parser, Debug)]
#[command(
    name = "unified-crawler",
    version,
    about = "Collects community posts and YouTube results into spreadsheets"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl recent posts from a community board
    Crawl {
        /// fmkorea, dcinside or theqoo
        #[arg(long, value_parser = parse_site)]
        site: Site,

        /// Board list URL
        #[arg(long)]
        url: String,

        /// Look-back window in days
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(0..=3650))]
        days: i64,

        /// Additional look-back hours
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..=8760))]
        hours: i64,

        /// Output spreadsheet (default: desktop, timestamped)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        show_browser: bool,
    },

    /// Search YouTube for a keyword
    Youtube {
        #[arg(short, long)]
        keyword: String,

        /// Number of results (default from config)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Output spreadsheet
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write an HTML table
        #[arg(long)]
        html: Option<PathBuf>,

        /// Fetch captions for every result
        #[arg(long)]
        captions: bool,
    },

    /// Print the caption text of one video
    Caption {
        /// Video URL or id
        url: String,
    },

    /// License management
    License {
        #[command(subcommand)]
        action: LicenseCommand,
    },

    /// ChromeDriver setup
    Driver {
        #[command(subcommand)]
        action: DriverCommand,
    },

    /// Validate the configuration file and external tools
    Validate,
}

#[derive(Subcommand, Debug)]
enum DriverCommand {
    /// Copy a chromedriver binary into the shared config directory
    Install {
        /// Downloaded chromedriver binary
        #[arg(long)]
        from: PathBuf,
    },

    /// Show which chromedriver would be used
    Show,
}

#[derive(Subcommand, Debug)]
enum LicenseCommand {
    /// Verify the installed license
    Verify,

    /// Verify and install a license token
    Activate { token: String },

    /// Print this machine's device id
    DeviceId,

    /// Generate a signing key pair
    Keygen,

    /// Sign a new license token
    Issue {
        /// Base64 private seed from `keygen`
        #[arg(long, env = "UNIFIED_CRAWLER_SIGNING_SEED", hide_env_values = true)]
        seed: String,

        #[arg(long)]
        user: String,

        #[arg(long)]
        email: Option<String>,

        /// Bind the license to a device id
        #[arg(long)]
        device: Option<String>,

        /// Expiry date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        exp: chrono::NaiveDate,

        /// Comma-separated feature names
        #[arg(long, value_delimiter = ',', default_value = "community,youtube")]
        features: Vec<String>,
    },
}

fn parse_site(value: &str) -> std::result::Result<Site, String> {
    value.parse().map_err(|e: AppError| e.to_string())
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn caption_retriever(env: &Environment, allow_non_korean: bool) -> Result<CaptionRetriever> {
    let ytdlp = Arc::new(YtDlp::locate(env.find_cookies())?);
    Ok(CaptionRetriever::new(ytdlp, env.cache_dir.clone(), allow_non_korean))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = Environment::from_process();
    let loaded = load_config(&cli.config, &env);
    let level = loaded
        .as_ref()
        .map_or("info", |config| config.logging.level.as_str());
    init_logging(cli.verbose, level);

    // Tooling commands run even when the configuration is invalid.
    match &cli.command {
        Command::Validate => {
            pipeline::run_validate(&cli.config, &env)?;
            return Ok(());
        }
        Command::Driver { action } => {
            match action {
                DriverCommand::Install { from } => {
                    let installed = install_driver(&env, from)?;
                    println!("{}", installed.display());
                }
                DriverCommand::Show => {
                    println!("{}", resolve_driver_path(&env)?.display());
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let config = loaded?;
    let store = LicenseStore::new(env.clone());

    match cli.command {
        Command::Crawl {
            site,
            url,
            days,
            hours,
            output,
            show_browser,
        } => {
            let request = CrawlRequest {
                site,
                list_url: url,
                look_back: look_back(days, hours)?,
            };
            request.validate()?;

            let verifier = LicenseVerifier::embedded()?;
            let payload = pipeline::authorize(&store, &verifier, &config.license.community_feature)?;
            let watermark = Watermark::from(&payload);

            let driver = resolve_driver_path(&env)?;
            log::info!("Using ChromeDriver at {}", driver.display());

            let mut config = config;
            if show_browser {
                config.crawler.headless = false;
            }
            let launcher = ChromeDriverLauncher::new(driver, BrowserOptions::from(&config.crawler))?;
            pipeline::run_crawl(&config, Arc::new(launcher), &request, output, Some(&watermark)).await?;
        }

        Command::Youtube {
            keyword,
            count,
            output,
            html,
            captions,
        } => {
            let verifier = LicenseVerifier::embedded()?;
            let payload = pipeline::authorize(&store, &verifier, &config.license.youtube_feature)?;
            let watermark = Watermark::from(&payload);

            let ytdlp = Arc::new(YtDlp::locate(env.find_cookies())?);
            let retriever = CaptionRetriever::new(
                ytdlp.clone(),
                env.cache_dir.clone(),
                config.youtube.allow_non_korean,
            );
            let job = YoutubeJob {
                keyword,
                count,
                output,
                html,
                include_captions: captions,
            };
            pipeline::run_youtube(&config, ytdlp, Some(&retriever), &job, Some(&watermark)).await?;
        }

        Command::Caption { url } => {
            let verifier = LicenseVerifier::embedded()?;
            pipeline::authorize(&store, &verifier, &config.license.youtube_feature)?;

            let retriever = caption_retriever(&env, config.youtube.allow_non_korean)?;
            println!("{}", pipeline::run_caption(&retriever, &url).await);
        }

        Command::License { action } => match action {
            LicenseCommand::Verify => {
                pipeline::run_verify(&store, &LicenseVerifier::embedded()?)?;
            }
            LicenseCommand::Activate { token } => {
                pipeline::run_activate(token.trim(), &store, &LicenseVerifier::embedded()?)?;
            }
            LicenseCommand::DeviceId => {
                let id = pipeline::run_device_id(&SystemDeviceId)
                    .ok_or_else(|| AppError::config("device id unavailable"))?;
                println!("{id}");
            }
            LicenseCommand::Keygen => {
                let keys = pipeline::run_keygen()?;
                println!("PRIVATE_SEED_B64 = {}", keys.private_seed);
                println!("PUBLIC_KEY_B64   = {}", keys.public_key);
            }
            LicenseCommand::Issue {
                seed,
                user,
                email,
                device,
                exp,
                features,
            } => {
                let features: BTreeSet<String> = features
                    .into_iter()
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect();
                let request = IssueRequest {
                    owner: user,
                    email,
                    device_id: device,
                    expiry: exp,
                    features,
                };
                println!("{}", pipeline::run_issue(request, &seed)?);
            }
        },

        Command::Validate | Command::Driver { .. } => {}
    }

    Ok(())
}
