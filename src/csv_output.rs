//! Two-column CSV rendering of a [`MonthHistogram`]
//!
//! ```text
//! Date, Fixed tickets
//! 2015-01, 0
//! 2015-02, 3
//! ```

use crate::error::{Result, TrendError};
use crate::histogram::MonthHistogram;
use std::fmt::Write as _;
use std::fs::{self, Permissions};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

pub const CSV_HEADER: &str = "Date, Fixed tickets";

pub struct CsvEmitter;

impl CsvEmitter {
    pub fn render(histogram: &MonthHistogram) -> String {
        let mut out = String::with_capacity(CSV_HEADER.len() + 1 + histogram.len() * 12);
        out.push_str(CSV_HEADER);
        out.push('\n');
        for (month, count) in histogram.iter() {
            // Writing to a String cannot fail
            let _ = writeln!(out, "{}, {}", month, count);
        }
        out
    }

    /// Write the rendered histogram to `path`, replacing any existing file.
    ///
    /// The content goes to a temporary file in the same directory first and
    /// is renamed over `path`, so readers never see a half-written file. An
    /// existing file keeps its permissions; a new one is created `0644`.
    pub fn write_to(path: &Path, histogram: &MonthHistogram) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| TrendError::output_write(path, e))?;
        // The temp file starts out owner-only
        if let Some(permissions) = Self::target_permissions(path) {
            temp.as_file()
                .set_permissions(permissions)
                .map_err(|e| TrendError::output_write(path, e))?;
        }
        temp.write_all(Self::render(histogram).as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|e| TrendError::output_write(path, e))?;
        temp.persist(path)
            .map_err(|e| TrendError::output_write(path, e.error))?;

        debug!(path = %path.display(), rows = histogram.len(), "Wrote CSV output");
        Ok(())
    }

    fn target_permissions(path: &Path) -> Option<Permissions> {
        match fs::metadata(path) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(_) => Self::default_permissions(),
        }
    }

    #[cfg(unix)]
    fn default_permissions() -> Option<Permissions> {
        use std::os::unix::fs::PermissionsExt;
        Some(Permissions::from_mode(0o644))
    }

    #[cfg(not(unix))]
    fn default_permissions() -> Option<Permissions> {
        None
    }
}
