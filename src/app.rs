use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::error::ReportError;
use crate::extract::{ArchiveExtractor, ExtractReport};
use crate::fetch::{FetchReport, Fetcher, PortalDriver};
use crate::fs_util;
use crate::loader::RecordLoader;
use crate::report::{ReportOutcome, ReportWriter};
use crate::store::{StateKey, StateStore, Workspace};
use crate::table::{self, Table};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub skip_fetch: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub fetch: Option<FetchReport>,
    pub extract: ExtractReport,
    pub files_loaded: usize,
    pub files_rejected: usize,
    pub rows_consolidated: usize,
    pub reports: Vec<ReportOutcome>,
    pub finished_at: String,
}

/// Records read from the staging directory in one pass.
#[derive(Debug, Clone, Default)]
pub struct Consolidation {
    pub records: Option<Table>,
    pub files_loaded: usize,
    pub files_rejected: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App {
    config: ResolvedConfig,
    workspace: Workspace,
    state: StateStore,
}

impl App {
    pub fn new(config: ResolvedConfig) -> Self {
        let workspace = Workspace::new(config.base_dir.clone());
        let state = workspace.state_store();
        Self {
            config,
            workspace,
            state,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Full pipeline: download, extract, consolidate, report.
    pub fn run(
        &self,
        options: RunOptions,
        driver: &mut dyn PortalDriver,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, ReportError> {
        self.workspace.ensure_dirs()?;

        let fetch = if options.skip_fetch {
            None
        } else {
            Some(self.fetch(driver, sink)?)
        };
        let extract = self.extract(sink)?;
        let consolidation = self.consolidate(sink)?;

        let rows_consolidated = consolidation.records.as_ref().map(Table::len).unwrap_or(0);
        let reports = match &consolidation.records {
            Some(records) => self.write_reports(records, sink)?,
            None => {
                info!("no new records to consolidate; reports not generated");
                Vec::new()
            }
        };

        Ok(RunSummary {
            fetch,
            extract,
            files_loaded: consolidation.files_loaded,
            files_rejected: consolidation.files_rejected,
            rows_consolidated,
            reports,
            finished_at: chrono::Local::now().to_rfc3339(),
        })
    }

    pub fn fetch(
        &self,
        driver: &mut dyn PortalDriver,
        sink: &dyn ProgressSink,
    ) -> Result<FetchReport, ReportError> {
        sink.event(ProgressEvent {
            message: "phase=Fetch; walking portal listings".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let mut downloaded = self.state.load(StateKey::Downloads)?;
        let download_dir = self.workspace.download_dir();
        let report = Fetcher::new(&self.config.portal, &self.state, &download_dir)
            .run(driver, &mut downloaded)?;
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; downloaded={}", report.downloaded.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(report)
    }

    pub fn extract(&self, sink: &dyn ProgressSink) -> Result<ExtractReport, ReportError> {
        sink.event(ProgressEvent {
            message: "phase=Extract; unpacking new archives".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let mut extracted = self.state.load(StateKey::Extracted)?;
        let report = ArchiveExtractor::new(&self.state, &self.config.records.archive_extension)
            .extract_new(
                &self.workspace.download_dir(),
                &self.workspace.extract_dir(),
                &mut extracted,
            )?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Extract; extracted={} corrupt={}",
                report.extracted.len(),
                report.corrupt.len()
            ),
            elapsed: Some(start.elapsed()),
        });
        Ok(report)
    }

    /// Loads and deletes every staged record file, then stacks the tables.
    pub fn consolidate(&self, sink: &dyn ProgressSink) -> Result<Consolidation, ReportError> {
        sink.event(ProgressEvent {
            message: "phase=Load; reading staged record files".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let loader = RecordLoader::new(&self.config.records);
        let files = fs_util::files_with_extension(
            &self.workspace.extract_dir(),
            &self.config.records.record_extension,
        )?;

        let mut tables = Vec::with_capacity(files.len());
        let mut files_rejected = 0usize;
        for file in &files {
            match loader.load_and_consume(file) {
                Some(table) => tables.push(table),
                None => files_rejected += 1,
            }
        }

        let files_loaded = tables.len();
        let records = table::concat(tables);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Load; loaded={files_loaded} rejected={files_rejected} rows={}",
                records.as_ref().map(Table::len).unwrap_or(0)
            ),
            elapsed: Some(start.elapsed()),
        });
        Ok(Consolidation {
            records,
            files_loaded,
            files_rejected,
        })
    }

    pub fn write_reports(
        &self,
        records: &Table,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<ReportOutcome>, ReportError> {
        sink.event(ProgressEvent {
            message: "phase=Report; filtering records".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let output_dir = self.workspace.output_dir();
        let writer = ReportWriter::new(
            &output_dir,
            &self.config.reports,
            &self.config.records.columns,
        );
        let outcomes = writer.generate(records, &self.config.companies, &self.config.segments)?;
        sink.event(ProgressEvent {
            message: format!("phase=Report; reports={}", outcomes.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(outcomes)
    }
}
