use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wikicrawl_core::client::{MediaWikiClient, WikiSource};
use wikicrawl_core::config::{
    ConfigOverrides, CrawlerConfig, DEFAULT_CONFIG_FILENAME, load_config_file,
};
use wikicrawl_core::crawl::{CrawlReport, PageOutcome, crawl, fetch_page_text, list_pages};

#[derive(Debug, Parser)]
#[command(
    name = "wikicrawl",
    version,
    about = "Crawl every page of a MediaWiki site into plain-text files"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (default: ./wikicrawl.toml)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "URL", help = "Wiki base URL")]
    wiki_url: Option<String>,
    #[arg(long, global = true, value_name = "URL", help = "MediaWiki api.php URL")]
    api_url: Option<String>,
    #[arg(long, global = true, value_name = "PATH", help = "Page URL path with $1 for the title")]
    article_path: Option<String>,
    #[arg(long, global = true, value_name = "PATH", help = "Directory for the .txt files")]
    output_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "AGENT")]
    user_agent: Option<String>,
    #[arg(long, global = true, value_name = "MS", help = "Per-request timeout (default: none)")]
    timeout_ms: Option<u64>,
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "More logging (-v debug, -vv trace)")]
    verbose: u8,
    #[arg(short, long, global = true, help = "Only log errors")]
    quiet: bool,
    #[arg(long, global = true, help = "Print resolved configuration before running")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            wiki_url: self.wiki_url.clone(),
            api_url: self.api_url.clone(),
            article_path: self.article_path.clone(),
            user_agent: self.user_agent.clone(),
            timeout_ms: self.timeout_ms,
            output_dir: self.output_dir.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List every page and write one .txt file per page (default)")]
    Crawl(CrawlArgs),
    #[command(about = "Print every page title returned by the wiki")]
    List,
    #[command(about = "Print the extracted text of a single page")]
    Page(PageArgs),
}

#[derive(Debug, Args)]
struct CrawlArgs {
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

#[derive(Debug, Args)]
struct PageArgs {
    title: String,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = load_env_then_log_filter(None, cli.verbose, cli.quiet);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(&cli)?;
    debug!(?config, "configuration resolved");
    if cli.diagnostics {
        eprintln!("[diagnostics]\n{}\n", config.diagnostics());
    }

    match cli.command {
        Some(Commands::Crawl(args)) => run_crawl(&config, args.format),
        Some(Commands::List) => run_list(&config),
        Some(Commands::Page(PageArgs { title })) => run_page(&config, &title),
        None => run_crawl(&config, ReportFormat::Text),
    }
}

/// Load `.env` (or `env_file`) first so a `RUST_LOG` set there is honored.
fn load_env_then_log_filter(env_file: Option<&Path>, verbose: u8, quiet: bool) -> EnvFilter {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    log_filter(verbose, quiet)
}

/// `RUST_LOG` wins; otherwise `-q` → error, default info, `-v` debug, `-vv` trace.
fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn resolve_config(cli: &Cli) -> Result<CrawlerConfig> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
    if cli.config.is_some() && !config_path.exists() {
        bail!("config file not found: {}", normalize_path(&config_path));
    }
    let file = load_config_file(&config_path)?;
    CrawlerConfig::resolve(&file, &cli.overrides()).context("invalid crawler configuration")
}

fn run_crawl(config: &CrawlerConfig, format: ReportFormat) -> Result<()> {
    let report = crawl(config)?;
    match format {
        ReportFormat::Text => print_report(config, &report),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn run_list(config: &CrawlerConfig) -> Result<()> {
    let mut client = MediaWikiClient::new(config.clone())?;
    let listing = list_pages(&mut client).context("failed to list wiki pages")?;
    for title in &listing.titles {
        println!("{title}");
    }
    if listing.is_truncated() {
        eprintln!(
            "warning: page list truncated by the API after {} titles (apcontinue={})",
            listing.titles.len(),
            listing.continuation.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

fn run_page(config: &CrawlerConfig, title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        bail!("page requires a non-empty title");
    }
    let mut client = MediaWikiClient::new(config.clone())?;
    let text = fetch_page_text(&mut client, title)
        .with_context(|| format!("failed to fetch {}", client.page_url(title)))?;
    print!("{text}");
    debug!(requests = client.request_count(), "page fetched");
    Ok(())
}

fn print_report(config: &CrawlerConfig, report: &CrawlReport) {
    println!("crawl");
    println!("wiki_url: {}", config.wiki_url);
    println!("output_dir: {}", normalize_path(&config.output_dir));
    println!("listed: {}", report.listed);
    println!("written: {}", report.written);
    println!("failed: {}", report.failed);
    println!("truncated: {}", format_flag(report.truncated));
    if let Some(token) = &report.continuation {
        println!("continuation: {token}");
    }
    println!("request_count: {}", report.request_count);
    for page in report.failures() {
        if let PageOutcome::Failed {
            title,
            stage,
            error,
        } = page
        {
            println!("failed.{}: {title}: {error}", stage.as_str());
        }
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;

    use tempfile::tempdir;

    use super::load_env_then_log_filter;

    #[test]
    fn rust_log_from_env_file_drives_the_filter() {
        if env::var_os("RUST_LOG").is_some() {
            return;
        }
        let temp = tempdir().expect("tempdir");
        let env_file = temp.path().join(".env");
        fs::write(&env_file, "RUST_LOG=wikicrawl_core=trace\n").expect("write .env");

        let filter = load_env_then_log_filter(Some(&env_file), 0, true);
        assert_eq!(filter.to_string(), "wikicrawl_core=trace");
    }
}
