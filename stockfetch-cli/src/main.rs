//! stockfetch CLI: listings, downloads, statistics, and the interactive menu.
//!
//! Commands:
//! - `download`: fetch daily price history for symbols into `{SYMBOL}.csv` files
//! - `stats`: report the number and size of downloaded files
//! - `listings`: fetch exchange listings from the NASDAQ screener and summarize them
//! - `interactive`: numbered menu for the common download tasks

mod interactive;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockfetch_core::data::report::{format_listing_report, report_storage, summarize_listings};
use stockfetch_core::data::{
    download_batches, summarize, CircuitBreaker, CsvStore, DataProvider, Exchange,
    ListingClient, ProviderFetcher, RunSummary, SymbolSource, ThreadPacer, TracingProgress, YahooProvider,
};
use stockfetch_core::{BatchJobConfig, DownloadSettings};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockfetch",
    about = "stockfetch: bulk daily price history downloader for US-listed stocks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download price history for symbols, skipping those already on disk.
    Download(DownloadArgs),
    /// Show how many price files are on disk and their total size.
    Stats {
        /// Directory holding the {SYMBOL}.csv files. Defaults to ./stock_data.
        #[arg(long)]
        storage_dir: Option<PathBuf>,

        /// TOML settings file with a [download] table.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Fetch exchange listings from the NASDAQ screener, then summarize them.
    Listings {
        /// Exchanges to fetch (nasdaq, amex, nyse). Defaults to all three.
        #[arg(long = "exchange")]
        exchanges: Vec<Exchange>,

        /// Directory for {exchange}.json files. Defaults to the current directory.
        #[arg(long)]
        listings_dir: Option<PathBuf>,

        /// Only summarize listings already on disk.
        #[arg(long, default_value_t = false)]
        analyze_only: bool,
    },
    /// Numbered menu: sample download, full download, statistics.
    Interactive {
        /// Directory holding the {SYMBOL}.csv files. Defaults to ./stock_data.
        #[arg(long)]
        storage_dir: Option<PathBuf>,

        /// Directory holding the {exchange}.json listings. Defaults to the current directory.
        #[arg(long)]
        listings_dir: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct DownloadArgs {
    /// Symbols to download (e.g. AAPL MSFT GOOGL).
    #[arg(short = 's', long, num_args = 1.., conflicts_with_all = ["symbols_file", "sample"])]
    symbols: Vec<String>,

    /// File with one symbol per line.
    #[arg(short = 'f', long, conflicts_with = "sample")]
    symbols_file: Option<PathBuf>,

    /// Download only the first N symbols from the saved listings.
    #[arg(long)]
    sample: Option<usize>,

    /// Lookback period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max. Defaults to 1y.
    #[arg(short = 'p', long)]
    period: Option<String>,

    /// Start date (YYYY-MM-DD). Takes precedence over --period.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Inclusive: bars dated on the end day are
    /// downloaded, unlike an exclusive end bound. Requires --start.
    #[arg(long)]
    end: Option<String>,

    /// Symbols per batch. Defaults to 20.
    #[arg(short = 'b', long, allow_negative_numbers = true)]
    batch_size: Option<i64>,

    /// Seconds between requests; batches are separated by twice this. Defaults to 1.0.
    #[arg(short = 'd', long, allow_negative_numbers = true)]
    delay: Option<f64>,

    /// Directory holding the {SYMBOL}.csv files. Defaults to ./stock_data.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Directory holding the {exchange}.json listings. Defaults to the current directory.
    #[arg(long)]
    listings_dir: Option<PathBuf>,

    /// TOML settings file with a [download] table. Flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl DownloadArgs {
    fn flag_settings(&self) -> DownloadSettings {
        DownloadSettings {
            storage_dir: self.storage_dir.clone(),
            listings_dir: self.listings_dir.clone(),
            batch_size: self.batch_size,
            delay_secs: self.delay,
            period: self.period.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    /// Pick the symbol source: explicit list, then file, then sample, then all listings.
    fn source(&self, listings_dir: &Path) -> (SymbolSource, Option<usize>) {
        if !self.symbols.is_empty() {
            (SymbolSource::List(self.symbols.clone()), None)
        } else if let Some(path) = &self.symbols_file {
            (SymbolSource::File(path.clone()), None)
        } else {
            (SymbolSource::Listings(listings_dir.to_path_buf()), self.sample)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download(args) => run_download(&args),
        Commands::Stats {
            storage_dir,
            config,
        } => {
            let settings = load_settings(config.as_deref())?.merged_with(DownloadSettings {
                storage_dir,
                ..Default::default()
            });
            println!("{}", report_storage(&settings.storage_dir()));
            Ok(())
        }
        Commands::Listings {
            exchanges,
            listings_dir,
            analyze_only,
        } => run_listings(exchanges, listings_dir, analyze_only),
        Commands::Interactive {
            storage_dir,
            listings_dir,
        } => {
            let settings = DownloadSettings {
                storage_dir,
                listings_dir,
                ..Default::default()
            };
            let stdin = std::io::stdin();
            interactive::run_menu(
                &mut stdin.lock(),
                &mut std::io::stdout(),
                &settings.storage_dir(),
                &settings.listings_dir(),
            )
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<DownloadSettings> {
    match path {
        Some(path) => DownloadSettings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(DownloadSettings::default()),
    }
}

fn run_download(args: &DownloadArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?.merged_with(args.flag_settings());

    // Validate everything before touching the network.
    let job = settings.job_config().context("invalid download configuration")?;

    let (source, sample) = args.source(&settings.listings_dir());
    let symbols = match sample {
        Some(n) => source.sample(n),
        None => source.load(),
    };

    if symbols.is_empty() {
        tracing::error!("no symbols to download");
        return Ok(());
    }

    execute_download(&symbols, &job, &settings.storage_dir())?;
    println!("{}", report_storage(&settings.storage_dir()));
    Ok(())
}

/// Run the batch controller against Yahoo Finance and print the summary line.
pub(crate) fn execute_download(
    symbols: &[String],
    job: &BatchJobConfig,
    storage_dir: &Path,
) -> Result<RunSummary> {
    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker)?;
    let store = CsvStore::new(storage_dir);
    let fetcher = ProviderFetcher::new(&provider, &store);

    tracing::info!(
        count = symbols.len(),
        provider = provider.name(),
        dir = %store.storage_dir().display(),
        "preparing download"
    );
    let summary = download_batches(
        symbols,
        job,
        &store,
        &fetcher,
        &ThreadPacer,
        &TracingProgress,
    );

    println!("{}", summarize(&summary));
    Ok(summary)
}

fn run_listings(
    exchanges: Vec<Exchange>,
    listings_dir: Option<PathBuf>,
    analyze_only: bool,
) -> Result<()> {
    let listings_dir = DownloadSettings {
        listings_dir,
        ..Default::default()
    }
    .listings_dir();

    if !analyze_only {
        let exchanges = if exchanges.is_empty() {
            Exchange::ALL.to_vec()
        } else {
            exchanges
        };
        let client = ListingClient::new()?;
        let results = client.fetch_all(&exchanges, &listings_dir);
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        if failed == results.len() {
            bail!("every listing request failed");
        }
    }

    println!("{}", format_listing_report(&summarize_listings(&listings_dir)));
    Ok(())
}
