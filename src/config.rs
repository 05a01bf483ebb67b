use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

pub const DEFAULT_CONFIG_FILE: &str = "consumidor-reports.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub records: Option<RecordsSection>,
    #[serde(default)]
    pub reports: Option<ReportsSection>,
    #[serde(default)]
    pub portal: Option<PortalSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RecordsSection {
    #[serde(default)]
    pub encodings: Option<Vec<String>>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub archive_extension: Option<String>,
    #[serde(default)]
    pub record_extension: Option<String>,
    #[serde(default)]
    pub columns: Option<ColumnsSection>,
    #[serde(default)]
    pub required_columns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ColumnsSection {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ReportsSection {
    #[serde(default)]
    pub company_prefix: Option<String>,
    #[serde(default)]
    pub segment_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PortalSection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub listing_prefix: Option<String>,
    #[serde(default)]
    pub partial_download_suffix: Option<String>,
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub initial_settle_secs: Option<u64>,
    #[serde(default)]
    pub download_start_delay_secs: Option<u64>,
    #[serde(default)]
    pub between_downloads_secs: Option<u64>,
    #[serde(default)]
    pub page_settle_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub display_name: String,
    pub segment: String,
    pub subject: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            display_name: "Nome Fantasia".to_string(),
            segment: "Segmento de Mercado".to_string(),
            subject: "Assunto".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordSettings {
    pub encodings: Vec<&'static Encoding>,
    pub delimiter: u8,
    pub archive_extension: String,
    pub record_extension: String,
    pub columns: ColumnNames,
    pub required_columns: Vec<String>,
}

impl Default for RecordSettings {
    fn default() -> Self {
        let columns = ColumnNames::default();
        Self {
            encodings: vec![encoding_rs::UTF_8, encoding_rs::WINDOWS_1252],
            delimiter: b';',
            archive_extension: "zip".to_string(),
            record_extension: "csv".to_string(),
            required_columns: vec![columns.display_name.clone(), columns.segment.clone()],
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub company_prefix: String,
    pub segment_prefix: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            company_prefix: "dados_empresas".to_string(),
            segment_prefix: "dados_segmento".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSettings {
    pub url: String,
    pub listing_prefix: String,
    pub partial_download_suffix: String,
    pub download_timeout: Duration,
    pub poll_interval: Duration,
    pub initial_settle: Duration,
    pub download_start_delay: Duration,
    pub between_downloads: Duration,
    pub page_settle: Duration,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            url: "https://consumidor.gov.br/pages/dadosabertos/externo/".to_string(),
            listing_prefix: "Dados -".to_string(),
            partial_download_suffix: ".crdownload".to_string(),
            download_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1000),
            initial_settle: Duration::from_secs(40),
            download_start_delay: Duration::from_secs(2),
            between_downloads: Duration::from_secs(3),
            page_settle: Duration::from_secs(5),
        }
    }
}

impl PortalSettings {
    /// Settings with every pause and timeout set to zero.
    pub fn immediate() -> Self {
        Self {
            download_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            initial_settle: Duration::ZERO,
            download_start_delay: Duration::ZERO,
            between_downloads: Duration::ZERO,
            page_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_dir: Utf8PathBuf,
    pub companies: Vec<String>,
    pub segments: Vec<String>,
    pub records: RecordSettings,
    pub reports: ReportSettings,
    pub portal: PortalSettings,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            base_dir: Utf8PathBuf::from("dados_consumidor_gov"),
            companies: Vec::new(),
            segments: Vec::new(),
            records: RecordSettings::default(),
            reports: ReportSettings::default(),
            portal: PortalSettings::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file. An explicit path must exist; the default file
    /// is optional and falls back to built-in settings.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ReportError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(ReportError::MissingConfig(config_path));
            }
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ReportError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ReportError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ReportError> {
        let defaults = ResolvedConfig::default();

        let base_dir = config
            .base_dir
            .map(Utf8PathBuf::from)
            .unwrap_or(defaults.base_dir);

        let records = match config.records {
            Some(section) => resolve_records(section)?,
            None => defaults.records,
        };

        let reports = match config.reports {
            Some(section) => ReportSettings {
                company_prefix: section
                    .company_prefix
                    .unwrap_or(defaults.reports.company_prefix),
                segment_prefix: section
                    .segment_prefix
                    .unwrap_or(defaults.reports.segment_prefix),
            },
            None => defaults.reports,
        };

        let portal = match config.portal {
            Some(section) => resolve_portal(section, defaults.portal),
            None => defaults.portal,
        };

        Ok(ResolvedConfig {
            base_dir,
            companies: clean_terms(config.companies),
            segments: clean_terms(config.segments),
            records,
            reports,
            portal,
        })
    }
}

fn resolve_records(section: RecordsSection) -> Result<RecordSettings, ReportError> {
    let defaults = RecordSettings::default();

    let encodings = match section.encodings {
        Some(labels) if !labels.is_empty() => labels
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| ReportError::UnknownEncoding(label.clone()))
            })
            .collect::<Result<Vec<_>, ReportError>>()?,
        _ => defaults.encodings,
    };

    let delimiter = match section.delimiter {
        Some(value) => match value.as_bytes() {
            [byte] => *byte,
            _ => return Err(ReportError::InvalidDelimiter(value)),
        },
        None => defaults.delimiter,
    };

    let columns = match section.columns {
        Some(columns) => ColumnNames {
            display_name: columns
                .display_name
                .unwrap_or(defaults.columns.display_name.clone()),
            segment: columns.segment.unwrap_or(defaults.columns.segment.clone()),
            subject: columns.subject.unwrap_or(defaults.columns.subject.clone()),
        },
        None => defaults.columns.clone(),
    };

    let required_columns = section
        .required_columns
        .unwrap_or_else(|| vec![columns.display_name.clone(), columns.segment.clone()]);

    Ok(RecordSettings {
        encodings,
        delimiter,
        archive_extension: section
            .archive_extension
            .unwrap_or(defaults.archive_extension),
        record_extension: section
            .record_extension
            .unwrap_or(defaults.record_extension),
        columns,
        required_columns,
    })
}

fn resolve_portal(section: PortalSection, defaults: PortalSettings) -> PortalSettings {
    PortalSettings {
        url: section.url.unwrap_or(defaults.url),
        listing_prefix: section.listing_prefix.unwrap_or(defaults.listing_prefix),
        partial_download_suffix: section
            .partial_download_suffix
            .unwrap_or(defaults.partial_download_suffix),
        download_timeout: section
            .download_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.download_timeout),
        poll_interval: section
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval),
        initial_settle: section
            .initial_settle_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.initial_settle),
        download_start_delay: section
            .download_start_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.download_start_delay),
        between_downloads: section
            .between_downloads_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.between_downloads),
        page_settle: section
            .page_settle_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.page_settle),
    }
}

/// Splits a comma-separated list of filter terms, dropping blanks.
pub fn parse_terms(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_terms(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect()
}
