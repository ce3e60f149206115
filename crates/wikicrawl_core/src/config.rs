use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIKI_URL: &str = "https://nikke-goddess-of-victory-international.fandom.com";
pub const DEFAULT_USER_AGENT: &str = "wikicrawl/0.1";
pub const DEFAULT_ARTICLE_PATH: &str = "/wiki/$1";
pub const DEFAULT_CONFIG_FILENAME: &str = "wikicrawl.toml";

/// On-disk TOML layout. Every key is optional; unset keys fall through to
/// environment variables and then to defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub url: Option<String>,
    pub api_url: Option<String>,
    pub article_path: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct OutputSection {
    pub dir: Option<PathBuf>,
}

/// Values supplied on the command line. These win over everything else.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub wiki_url: Option<String>,
    pub api_url: Option<String>,
    pub article_path: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

/// Fully resolved crawler settings, threaded into the client and the crawl loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerConfig {
    pub wiki_url: String,
    pub api_url: String,
    pub article_path: String,
    pub user_agent: String,
    /// `None` leaves requests without a timeout.
    pub timeout_ms: Option<u64>,
    pub output_dir: PathBuf,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            wiki_url: DEFAULT_WIKI_URL.to_string(),
            api_url: format!("{DEFAULT_WIKI_URL}/api.php"),
            article_path: DEFAULT_ARTICLE_PATH.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl CrawlerConfig {
    /// Resolve from flags > process env > config file > defaults.
    pub fn resolve(file: &ConfigFile, overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with(file, overrides, |key| env::var(key).ok())
    }

    pub fn resolve_with<F>(file: &ConfigFile, overrides: &ConfigOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let wiki_url = overrides
            .wiki_url
            .clone()
            .or_else(|| env_value("WIKI_URL"))
            .or_else(|| file.wiki.url.clone());
        let api_url = overrides
            .api_url
            .clone()
            .or_else(|| env_value("WIKI_API_URL"))
            .or_else(|| file.wiki.api_url.clone());

        let (wiki_url, api_url) = match (wiki_url, api_url) {
            (Some(wiki), Some(api)) => (wiki, api),
            (Some(wiki), None) => {
                let api = derive_api_url(&wiki);
                (wiki, api)
            }
            (None, Some(api)) => {
                let wiki = derive_wiki_url(&api)
                    .ok_or_else(|| anyhow::anyhow!("cannot derive wiki URL from API URL {api}"))?;
                (wiki, api)
            }
            (None, None) => {
                let defaults = Self::default();
                (defaults.wiki_url, defaults.api_url)
            }
        };

        let article_path = overrides
            .article_path
            .clone()
            .or_else(|| env_value("WIKI_ARTICLE_PATH"))
            .or_else(|| file.wiki.article_path.clone())
            .unwrap_or_else(|| DEFAULT_ARTICLE_PATH.to_string());
        let user_agent = overrides
            .user_agent
            .clone()
            .or_else(|| env_value("WIKI_USER_AGENT"))
            .or_else(|| file.wiki.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let timeout_ms = match overrides.timeout_ms {
            Some(value) => Some(value),
            None => match env_value("WIKI_HTTP_TIMEOUT_MS") {
                Some(raw) => Some(
                    raw.parse::<u64>()
                        .with_context(|| format!("invalid WIKI_HTTP_TIMEOUT_MS: {raw}"))?,
                ),
                None => file.wiki.timeout_ms,
            },
        };
        let output_dir = overrides
            .output_dir
            .clone()
            .or_else(|| env_value("WIKICRAWL_OUTPUT_DIR").map(PathBuf::from))
            .or_else(|| file.output.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        let config = Self {
            wiki_url: wiki_url.trim().trim_end_matches('/').to_string(),
            api_url: api_url.trim().to_string(),
            article_path,
            user_agent,
            timeout_ms,
            output_dir,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_http_url("wiki URL", &self.wiki_url)?;
        let api_url = validate_http_url("API URL", &self.api_url)?;
        if api_url.query().is_some() {
            bail!(
                "API URL must be the bare api.php endpoint without query parameters: {}",
                self.api_url
            );
        }
        if !self.article_path.contains("$1") {
            bail!(
                "article path must contain the `$1` title placeholder: {}",
                self.article_path
            );
        }
        Ok(())
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "wiki_url={}\napi_url={}\narticle_path={}\nuser_agent={}\ntimeout_ms={}\noutput_dir={}",
            self.wiki_url,
            self.api_url,
            self.article_path,
            self.user_agent,
            self.timeout_ms
                .map(|value| value.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.output_dir.to_string_lossy().replace('\\', "/"),
        )
    }
}

/// Load and parse a config file. Returns defaults if the file doesn't exist.
pub fn load_config_file(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Derive wiki base URL from an API URL by stripping `/api.php` or `/w/api.php`.
pub fn derive_wiki_url(api_url: &str) -> Option<String> {
    let trimmed = api_url.trim();
    let stripped = trimmed
        .strip_suffix("/w/api.php")
        .or_else(|| trimmed.strip_suffix("/api.php"))
        .unwrap_or(trimmed);
    let result = stripped.trim_end_matches('/').to_string();
    if result.is_empty() { None } else { Some(result) }
}

pub fn derive_api_url(wiki_url: &str) -> String {
    format!("{}/api.php", wiki_url.trim().trim_end_matches('/'))
}

fn validate_http_url(label: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).with_context(|| format!("invalid {label}: {value}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{label} must use http or https: {value}");
    }
    Ok(url)
}
