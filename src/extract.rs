use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ReportError;
use crate::fs_util;
use crate::store::{ProcessedSet, StateKey, StateStore};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ExtractReport {
    pub extracted: Vec<String>,
    pub already_extracted: usize,
    pub corrupt: Vec<String>,
}

/// Unpacks archives from the landing directory into the staging directory,
/// once per archive name.
pub struct ArchiveExtractor<'a> {
    store: &'a StateStore,
    extension: &'a str,
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(store: &'a StateStore, extension: &'a str) -> Self {
        Self { store, extension }
    }

    /// Archives already in `extracted` are skipped. Each successful archive is
    /// recorded and saved before the next one is opened. Structurally invalid
    /// archives stay out of the set and are retried on the next run.
    pub fn extract_new(
        &self,
        landing: &Utf8Path,
        staging: &Utf8Path,
        extracted: &mut ProcessedSet,
    ) -> Result<ExtractReport, ReportError> {
        let mut report = ExtractReport::default();

        for archive in fs_util::files_with_extension(landing, self.extension)? {
            let Some(name) = archive.file_name() else {
                continue;
            };
            if extracted.contains(name) {
                debug!(archive = name, "already extracted");
                report.already_extracted += 1;
                continue;
            }

            match fs_util::extract_zip(archive.as_std_path(), staging.as_std_path()) {
                Ok(files) => {
                    extracted.insert(name);
                    self.store.save(StateKey::Extracted, extracted)?;
                    info!(archive = name, files, "extracted archive");
                    report.extracted.push(name.to_string());
                }
                Err(ReportError::Archive(reason)) => {
                    warn!(archive = name, %reason, "corrupt archive left in place");
                    report.corrupt.push(name.to_string());
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }
}
