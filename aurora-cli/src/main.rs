//! Aurora CLI: fetch, run, backfill and cache management commands.
//!
//! Commands:
//! - `weather` / `kp` / `nowcast` / `solar`: run one source and print CSV to stdout
//! - `run`: daily pipeline from a TOML config, exported to the output dir
//! - `backfill`: weather plus archive Kp over a date range
//! - `cache status` / `cache clear`: inspect or empty the HTTP response cache
//!
//! Logs go to stderr; `RUST_LOG` overrides `-v`/`-q`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;

use aurora_core::data::{aggregate_daily, kp_archive, NowcastLoader, NowcastOptions};
use aurora_core::data::{SolarWindFetcher, WeatherFetcher};
use aurora_core::domain::Location;
use aurora_core::http::{DiskCache, HttpClient, ResponseCache};
use aurora_core::table::FeatureTable;
use aurora_runner::export::table_to_csv;
use aurora_runner::{
    export, run_backfill, run_daily, HttpConfig, PipelineConfig, PipelineOutput, Sources,
};

#[derive(Parser)]
#[command(
    name = "aurora",
    version,
    about = "Aurora feature pipeline: weather, geomagnetic and solar-wind inputs"
)]
struct Cli {
    /// More logging (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Warnings and errors only.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily weather for a location and date range.
    Weather {
        /// First day (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Response cache directory.
        #[arg(long, default_value = ".cache")]
        cache_dir: PathBuf,

        /// Bypass the response cache.
        #[arg(long, default_value_t = false)]
        no_cache: bool,
    },
    /// One day from a historical Kp archive CSV.
    Kp {
        /// Archive CSV (YYYY, MM, DD, Kp1..Kp8, ap1..ap8, Ap).
        #[arg(long)]
        archive: PathBuf,

        #[arg(long)]
        day: NaiveDate,
    },
    /// Complete days from the GFZ Kp nowcast feed.
    Nowcast {
        /// Exclude today and later rows before windowing.
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        past_only: bool,

        /// Trailing window in days (at least 7).
        #[arg(long, default_value_t = 7)]
        window: usize,

        /// Reference day for --past-only. Defaults to today (UTC).
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Joined SWPC plasma and magnetic-field feed.
    Solar {
        /// Rows dated after this day are dropped. Defaults to today (UTC).
        #[arg(long)]
        run_date: Option<NaiveDate>,

        /// Average to one row per day.
        #[arg(long, default_value_t = false)]
        daily: bool,
    },
    /// Daily pipeline run, exported as CSV or Parquet with a manifest.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Defaults to today (UTC).
        #[arg(long)]
        run_date: Option<NaiveDate>,

        /// Overrides [output] dir.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Weather and archive Kp over a date range.
    Backfill {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        /// Overrides [output] dir.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// HTTP response cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report entry count and size.
    Status {
        #[arg(long, default_value = ".cache")]
        cache_dir: PathBuf,
    },
    /// Remove every cached response.
    Clear {
        #[arg(long, default_value = ".cache")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Weather {
            start,
            end,
            lat,
            lon,
            cache_dir,
            no_cache,
        } => run_weather(start, end, lat, lon, (!no_cache).then_some(cache_dir)),
        Commands::Kp { archive, day } => run_kp(&archive, day),
        Commands::Nowcast {
            past_only,
            window,
            as_of,
        } => run_nowcast(past_only, window, as_of.unwrap_or_else(today)),
        Commands::Solar { run_date, daily } => run_solar(run_date.unwrap_or_else(today), daily),
        Commands::Run {
            config,
            run_date,
            output_dir,
        } => {
            let config = load_config(&config, output_dir)?;
            let sources = Sources::from_config(&config)?;
            let output = run_daily(&config, &sources, run_date.unwrap_or_else(today))?;
            write_output(&config, &output)
        }
        Commands::Backfill {
            config,
            start,
            end,
            output_dir,
        } => {
            let config = load_config(&config, output_dir)?;
            let sources = Sources::from_config(&config)?;
            let output = run_backfill(&config, &sources, start, end)?;
            write_output(&config, &output)
        }
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clear { cache_dir } => run_cache_clear(&cache_dir),
        },
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "aurora={level},aurora_core={level},aurora_runner={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn load_config(path: &Path, output_dir: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    Ok(config)
}

/// Uncached client with the default retry policy.
fn live_client() -> Result<HttpClient> {
    let http = HttpConfig::default();
    Ok(HttpClient::live(http.timeout())?.with_retry(http.retry_policy()))
}

fn print_table(table: &dyn FeatureTable) -> Result<()> {
    let bytes = table_to_csv(table)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}

fn run_weather(
    start: NaiveDate,
    end: NaiveDate,
    lat: f64,
    lon: f64,
    cache_dir: Option<PathBuf>,
) -> Result<()> {
    let location = Location::new(lat, lon)?;
    let mut client = live_client()?;
    if let Some(dir) = cache_dir {
        client = client.with_cache(Arc::new(DiskCache::open(dir)?));
    }
    let series = WeatherFetcher::new(client).fetch(&location, start, end)?;
    print_table(&series)
}

fn run_kp(archive: &Path, day: NaiveDate) -> Result<()> {
    let record = kp_archive::load_day(archive, day)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn run_nowcast(past_only: bool, window: usize, as_of: NaiveDate) -> Result<()> {
    let options = NowcastOptions {
        window_days: window,
        require_past_only: past_only,
    };
    let series = NowcastLoader::new(live_client()?, options)?.fetch(as_of)?;
    print_table(&series)
}

fn run_solar(run_date: NaiveDate, daily: bool) -> Result<()> {
    let mut series = SolarWindFetcher::new(live_client()?).fetch(run_date)?;
    if daily {
        series = aggregate_daily(&series);
    }
    print_table(&series)
}

fn write_output(config: &PipelineConfig, output: &PipelineOutput) -> Result<()> {
    let manifest = export(output, &config.output.dir, config.output.format)?;
    for table in &manifest.tables {
        println!("  {:<24} {:>6} rows  {}", table.file, table.rows, &table.blake3[..12]);
    }
    println!("Output written to: {}", config.output.dir.display());
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let cache = DiskCache::open(cache_dir)?;
    let stats = cache.stats()?;
    println!("Cache: {}", cache.cache_dir().display());
    println!("  entries: {}", stats.entries);
    println!("  size:    {:.1} KiB", stats.bytes as f64 / 1024.0);
    Ok(())
}

fn run_cache_clear(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let removed = DiskCache::open(cache_dir)?.clear()?;
    info!(removed, "cache cleared");
    println!("Removed {removed} cached responses from {}", cache_dir.display());
    Ok(())
}
