use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;

mod config;
mod crawl;
mod details;
mod extract;
mod integrate;
mod logging;
mod normalize;
mod output;
mod pipeline;
mod render;
mod table;
mod types;

use config::PipelineConfig;
use details::HttpFetcher;
use pipeline::Pipeline;
use render::ChromeRenderer;
use types::Program;

#[derive(Parser)]
#[command(name = "grammy-awards")]
#[command(about = "Grammy and Latin Grammy nominations scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BrowserArgs {
    /// Chrome/Chromium executable (autodetected by default)
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,
    /// Show the browser window instead of running headless
    #[arg(long)]
    headful: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape both programs and write the integrated dataset
    Run {
        /// CONL config file with seed URL and output overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the dataset as CSV
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Run log file (appended to)
        #[arg(long, value_name = "PATH")]
        log: Option<PathBuf>,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// List the ceremony pages found on the awards listing
    Links {
        /// CONL config file with seed URL overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Extract nominations from a saved ceremony page
    Parse {
        #[arg(value_name = "HTML_FILE")]
        file: PathBuf,
        /// Ceremony title to stamp on every record
        #[arg(short, long)]
        title: String,
    },
    /// Clean a saved ceremony locations page
    Details {
        #[arg(value_name = "HTML_FILE")]
        file: PathBuf,
        /// Which program's table layout to expect: grammy or latin
        #[arg(short, long, default_value = "grammy")]
        program: Program,
    },
}

fn load_config(path: Option<PathBuf>, browser: BrowserArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path.as_deref())?;
    if browser.chrome.is_some() {
        config.browser.chrome = browser.chrome;
    }
    config.browser.headful |= browser.headful;
    Ok(config)
}

fn run_pipeline(mut config: PipelineConfig, output: Option<PathBuf>, csv: Option<PathBuf>) -> Result<()> {
    if let Some(output) = output {
        config.output.json = output;
    }
    if csv.is_some() {
        config.output.csv = csv;
    }

    let renderer = ChromeRenderer::new(config.browser.clone())?;
    let fetcher = HttpFetcher::new()?;
    let dataset = Pipeline::new(&config, &renderer, &fetcher).run_to_files()?;

    println!(
        "Wrote {} records to {}",
        dataset.len(),
        output::osc8_file_link(&config.output.json)
    );
    if let Some(csv) = &config.output.csv {
        println!("CSV: {}", output::osc8_file_link(csv));
    }
    Ok(())
}

fn run_links(config: PipelineConfig) -> Result<()> {
    let renderer = ChromeRenderer::new(config.browser.clone())?;
    let fetcher = HttpFetcher::new()?;
    let links = Pipeline::new(&config, &renderer, &fetcher).crawl_links()?;
    for link in &links {
        println!("{} -> {}", link.title, output::osc8_link(&link.url, &link.url));
    }
    println!("{} ceremonies", links.len());
    Ok(())
}

fn run_parse(file: PathBuf, title: &str) -> Result<()> {
    let html = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records = extract::extract_nominations(&html, title);
    info!("{} sections, {} records", extract::count_sections(&html), records.len());
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_details(file: PathBuf, program: Program) -> Result<()> {
    let html = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let table = table::parse_first_table(&html)
        .with_context(|| format!("No table found in {}", file.display()))?;
    let details = details::details_for(program, &table)?;
    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output,
            csv,
            log,
            browser,
        } => {
            let mut settings = load_config(config, browser)?;
            if let Some(log) = log {
                settings.log = log;
            }
            let _guard = logging::init(&settings.log)?;
            run_pipeline(settings, output, csv)
        }
        Commands::Links { config, browser } => {
            logging::init_console();
            run_links(load_config(config, browser)?)
        }
        Commands::Parse { file, title } => {
            logging::init_console();
            run_parse(file, &title)
        }
        Commands::Details { file, program } => {
            logging::init_console();
            run_details(file, program)
        }
    }
}
