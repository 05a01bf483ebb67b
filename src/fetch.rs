use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PortalSettings;
use crate::error::ReportError;
use crate::fs_util;
use crate::store::{ProcessedSet, StateKey, StateStore};
use crate::wait::{self, BoundedWait, WaitOutcome};

/// One downloadable row of the portal's publication table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
}

impl Listing {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Browser automation for the open-data portal. Downloads triggered through
/// it must land in the configured download directory.
pub trait PortalDriver {
    fn open(&mut self, url: &str) -> Result<(), ReportError>;
    /// Rows of the page currently displayed.
    fn listings(&mut self) -> Result<Vec<Listing>, ReportError>;
    fn download(&mut self, listing: &Listing) -> Result<(), ReportError>;
    /// Moves to the next page; `false` on the last one.
    fn next_page(&mut self) -> Result<bool, ReportError>;
    fn close(&mut self) {}
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FetchReport {
    pub opened: bool,
    pub pages: usize,
    pub downloaded: Vec<String>,
    pub already_downloaded: usize,
    pub failed: Vec<String>,
    pub timed_out: usize,
}

pub struct Fetcher<'a> {
    settings: &'a PortalSettings,
    store: &'a StateStore,
    landing: &'a Utf8Path,
}

impl<'a> Fetcher<'a> {
    pub fn new(settings: &'a PortalSettings, store: &'a StateStore, landing: &'a Utf8Path) -> Self {
        Self {
            settings,
            store,
            landing,
        }
    }

    /// Walks every page and downloads listings not yet in `downloaded`,
    /// saving the set after each one.
    pub fn run(
        &self,
        driver: &mut dyn PortalDriver,
        downloaded: &mut ProcessedSet,
    ) -> Result<FetchReport, ReportError> {
        let mut report = FetchReport::default();

        if let Err(err) = driver.open(&self.settings.url) {
            warn!(error = %err, "portal unavailable; skipping downloads");
            driver.close();
            return Ok(report);
        }
        report.opened = true;
        wait::pause(self.settings.initial_settle);

        let result = self.walk_pages(driver, downloaded, &mut report);
        driver.close();
        result.map(|()| report)
    }

    fn walk_pages(
        &self,
        driver: &mut dyn PortalDriver,
        downloaded: &mut ProcessedSet,
        report: &mut FetchReport,
    ) -> Result<(), ReportError> {
        loop {
            report.pages += 1;
            debug!(page = report.pages, "processing portal page");

            match driver.listings() {
                Ok(listings) => {
                    for listing in listings {
                        self.fetch_listing(driver, &listing, downloaded, report)?;
                    }
                }
                Err(err) => warn!(page = report.pages, error = %err, "unable to read listings"),
            }

            match driver.next_page() {
                Ok(true) => wait::pause(self.settings.page_settle),
                Ok(false) => {
                    info!(pages = report.pages, "reached last portal page");
                    return Ok(());
                }
                Err(err) => {
                    warn!(error = %err, "pagination stopped");
                    return Ok(());
                }
            }
        }
    }

    fn fetch_listing(
        &self,
        driver: &mut dyn PortalDriver,
        listing: &Listing,
        downloaded: &mut ProcessedSet,
        report: &mut FetchReport,
    ) -> Result<(), ReportError> {
        let name = listing.name.trim();
        if !name.starts_with(&self.settings.listing_prefix) {
            return Ok(());
        }
        if downloaded.contains(name) {
            report.already_downloaded += 1;
            return Ok(());
        }

        if let Err(err) = driver.download(listing) {
            warn!(listing = name, error = %err, "download failed");
            report.failed.push(name.to_string());
            return Ok(());
        }
        info!(listing = name, "downloading");

        wait::pause(self.settings.download_start_delay);
        let outcome = BoundedWait::new(self.settings.poll_interval, self.settings.download_timeout)
            .wait_until(|| {
                !fs_util::has_file_with_suffix(self.landing, &self.settings.partial_download_suffix)
                    .unwrap_or(false)
            });
        if outcome == WaitOutcome::TimedOut {
            debug!(listing = name, "download still in progress after timeout");
            report.timed_out += 1;
        }

        downloaded.insert(name);
        self.store.save(StateKey::Downloads, downloaded)?;
        report.downloaded.push(name.to_string());

        wait::pause(self.settings.between_downloads);
        Ok(())
    }
}
