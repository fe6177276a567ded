use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::aggregate::{MergePolicy, SortOrder};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_NAME: &str = "facet_extractor";
pub const ENV_PREFIX: &str = "FACET_EXTRACTOR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub extraction: ExtractionConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    pub sites: BTreeMap<String, SiteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub merge_policy: MergePolicy,
    pub sort_order: SortOrder,
    /// Require flat-regex labels to be upper-case.
    pub strict_brand_heuristic: bool,
    pub sentinels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub brand_header: String,
    pub count_header: String,
    pub byte_order_mark: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    /// Substring the URL host must contain.
    pub domain: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut sites = BTreeMap::new();

        sites.insert(
            "sephora".to_string(),
            SiteConfig {
                name: "Sephora".to_string(),
                domain: "sephora.".to_string(),
            },
        );

        sites.insert(
            "levelshoes".to_string(),
            SiteConfig {
                name: "Level Shoes".to_string(),
                domain: "levelshoes.com".to_string(),
            },
        );

        Config {
            http: HttpConfig {
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
                accept_language: "en-US,en;q=0.9".to_string(),
                timeout_seconds: 25,
                max_attempts: 3,
                backoff_base_ms: 1000,
            },
            extraction: ExtractionConfig {
                merge_policy: MergePolicy::Max,
                sort_order: SortOrder::CaseInsensitive,
                strict_brand_heuristic: true,
                sentinels: vec!["no".to_string(), "yes".to_string()],
            },
            export: ExportConfig {
                brand_header: "Brand".to_string(),
                count_header: "Count".to_string(),
                byte_order_mark: true,
            },
            logging: LoggingConfig {
                filter: "brand_facet_extractor=info".to_string(),
                format: LogFormat::Pretty,
            },
            sites,
        }
    }
}

impl Config {
    /// Defaults, then `facet_extractor.{toml,json,yaml}` (or `path`), then
    /// `FACET_EXTRACTOR_<SECTION>__<KEY>` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Human-readable list of supported domains, for error messages.
    pub fn supported_domains(&self) -> String {
        self.sites
            .values()
            .map(|site| site.domain.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_both_stores() {
        let config = Config::default();
        assert_eq!(config.sites["sephora"].domain, "sephora.");
        assert_eq!(config.sites["levelshoes"].domain, "levelshoes.com");
        assert_eq!(config.extraction.merge_policy, MergePolicy::Max);
        assert_eq!(config.export.brand_header, "Brand");
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!(
            "facet_extractor_config_test_{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[extraction]\nmerge_policy = \"first-wins\"\n\n[export]\nbyte_order_mark = false\n\n[http]\ntimeout_seconds = 40"
        )
        .unwrap();
        drop(file);

        let config = Config::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.extraction.merge_policy, MergePolicy::FirstWins);
        assert!(!config.export.byte_order_mark);
        assert_eq!(config.http.timeout_seconds, 40);
        // untouched values keep their defaults
        assert_eq!(config.http.max_attempts, 3);
        assert!(config.sites.contains_key("sephora"));
    }
}
