//! Best-effort post-mortem artifacts.
//!
//! Each artifact is captured independently; a failure is logged and the
//! remaining artifacts are still attempted. Capture never returns an error.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::dom;
use crate::page::Page;
use crate::selectors::SelectorTable;

pub const DEFAULT_DEBUG_DIR: &str = "downloaded_files/debug";

/// Paths of the artifacts that were written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureReport {
    pub screenshot: Option<PathBuf>,
    pub markup: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
}

impl CaptureReport {
    pub fn is_empty(&self) -> bool {
        self.screenshot.is_none() && self.markup.is_none() && self.metadata.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_DEBUG_DIR)
    }
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `{stamp}_{label}.png`, `.html` and `.txt` for the current page.
    pub fn capture<P: Page>(
        &self,
        page: &P,
        selectors: &SelectorTable,
        label: &str,
    ) -> CaptureReport {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "cannot create debug directory");
            return CaptureReport::default();
        }
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let base = format!("{stamp}_{}", sanitize(label));

        let report = CaptureReport {
            screenshot: self.write(&base, "png", "screenshot", || page.screenshot_png()),
            markup: self.write(&base, "html", "page source", || {
                page.page_source().map(String::into_bytes)
            }),
            metadata: self.write(&base, "txt", "metadata", || {
                Ok(metadata(page, selectors).into_bytes())
            }),
        };
        info!(label, artifacts = ?report, "diagnostics captured");
        report
    }

    fn write(
        &self,
        base: &str,
        ext: &str,
        what: &str,
        produce: impl FnOnce() -> Result<Vec<u8>>,
    ) -> Option<PathBuf> {
        let path = self.dir.join(format!("{base}.{ext}"));
        let written = produce().and_then(|bytes| Ok(std::fs::write(&path, bytes)?));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(artifact = what, error = %e, "diagnostic capture failed");
                None
            }
        }
    }
}

fn metadata<P: Page>(page: &P, selectors: &SelectorTable) -> String {
    let url = page
        .current_url()
        .unwrap_or_else(|e| format!("<unavailable: {e}>"));
    let title = page.title().unwrap_or_else(|e| format!("<unavailable: {e}>"));
    let outline = dom::capture_dialog_outline(page, selectors)
        .unwrap_or_else(|e| format!("<outline unavailable: {e}>"));
    format!("url={url}\ntitle={title}\n\n[dialog]\n{outline}\n")
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
