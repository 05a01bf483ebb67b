use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use consumidor_reports::app::{App, RunOptions, RunSummary};
use consumidor_reports::config::{ConfigLoader, parse_terms};
use consumidor_reports::error::ReportError;
use consumidor_reports::fetch::{Listing, PortalDriver};
use consumidor_reports::output::{JsonOutput, OutputMode, StderrProgress};
use consumidor_reports::report::ReportOutcome;

#[derive(Parser)]
#[command(name = "consumidor-reports")]
#[command(about = "Download consumer-complaint open data and build filtered spreadsheet reports")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to consumidor-reports.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Root directory for downloads, staging, state and reports
    #[arg(long)]
    base_dir: Option<String>,

    /// Comma-separated company names, e.g. "Equatorial, Banco do Brasil"
    #[arg(long)]
    companies: Option<String>,

    /// Comma-separated market segments, e.g. "Energia Elétrica, Bancos"
    #[arg(long)]
    segments: Option<String>,

    /// Only process archives already in the download directory
    #[arg(long)]
    skip_fetch: bool,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ReportError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ReportError) -> u8 {
    match error {
        ReportError::MissingConfig(_)
        | ReportError::ConfigRead(_)
        | ReportError::ConfigParse(_)
        | ReportError::UnknownEncoding(_)
        | ReportError::InvalidDelimiter(_)
        | ReportError::InvalidTerms(_) => 2,
        ReportError::Portal(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(base_dir) = cli.base_dir {
        config.base_dir = Utf8PathBuf::from(base_dir);
    }
    if let Some(companies) = cli.companies.as_deref() {
        config.companies = parse_terms(companies);
    }
    if let Some(segments) = cli.segments.as_deref() {
        config.segments = parse_terms(segments);
    }

    let app = App::new(config);
    let options = RunOptions {
        skip_fetch: cli.skip_fetch,
    };
    let mut driver = NopPortal;

    match output_mode {
        OutputMode::NonInteractive => {
            let summary = app.run(options, &mut driver, &JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            print_targets(&app);
            let summary = app.run(options, &mut driver, &StderrProgress)?;
            print_run_summary(&app, &summary);
        }
    }
    Ok(())
}

fn print_targets(app: &App) {
    let config = app.config();
    let describe = |terms: &[String]| {
        if terms.is_empty() {
            "(none)".to_string()
        } else {
            terms.join(", ")
        }
    };
    println!("{}", "-".repeat(30));
    println!("Target companies: {}", describe(config.companies.as_slice()));
    println!("Target segments : {}", describe(config.segments.as_slice()));
    println!("{}", "-".repeat(30));
}

fn print_run_summary(app: &App, summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}consumidor-reports summary{reset}");
    if let Some(fetch) = &summary.fetch {
        println!(
            "{green}downloaded: {} (already had {}){reset}",
            fetch.downloaded.len(),
            fetch.already_downloaded
        );
    }
    println!(
        "{green}archives extracted: {}{reset}",
        summary.extract.extracted.len()
    );
    if !summary.extract.corrupt.is_empty() {
        println!(
            "{yellow}corrupt archives (retried next run): {}{reset}",
            summary.extract.corrupt.join(", ")
        );
    }
    println!(
        "{green}record files loaded: {} rejected: {} rows: {}{reset}",
        summary.files_loaded, summary.files_rejected, summary.rows_consolidated
    );

    if summary.files_loaded == 0 {
        println!("{yellow}no new data to process{reset}");
    }
    for outcome in &summary.reports {
        match outcome {
            ReportOutcome::Written { file_name, rows } => {
                println!("{cyan}saved {file_name} ({rows} rows){reset}");
            }
            ReportOutcome::Skipped { file_name } => {
                println!("{yellow}filter matched nothing for {file_name}{reset}");
            }
        }
    }
    println!("Reports folder: {}", app.workspace().output_dir());
}

/// Stands in for the browser automation, which is not bundled.
struct NopPortal;

impl PortalDriver for NopPortal {
    fn open(&mut self, _url: &str) -> Result<(), ReportError> {
        Err(ReportError::Portal(
            "portal driver not configured".to_string(),
        ))
    }

    fn listings(&mut self) -> Result<Vec<Listing>, ReportError> {
        Ok(Vec::new())
    }

    fn download(&mut self, _listing: &Listing) -> Result<(), ReportError> {
        Err(ReportError::Portal(
            "portal driver not configured".to_string(),
        ))
    }

    fn next_page(&mut self) -> Result<bool, ReportError> {
        Ok(false)
    }
}
