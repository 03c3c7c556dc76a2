//! Screenshot and HTML capture for failed browser stages.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::browser::{BrowserError, BrowserPage};

/// Bound on each browser call made while capturing. A page that just timed
/// out on navigation may not answer at all.
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Paths written by one [`Diagnostics::capture`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedArtifacts {
    pub screenshot: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

/// Writes failure artifacts into a directory.
///
/// Capture is strictly best-effort: every I/O or browser error is logged and
/// swallowed so that diagnostics can never change a stage outcome.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a full-page screenshot and the current DOM of `page`.
    ///
    /// `label` names the failing stage and ends up in the file names.
    pub async fn capture(&self, page: &mut dyn BrowserPage, label: &str) -> CapturedArtifacts {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "cannot create diagnostics directory");
            return CapturedArtifacts::default();
        }

        let stem = format!(
            "{}-{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ"),
            sanitize(label),
            uuid::Uuid::new_v4().simple()
        );
        let mut captured = CapturedArtifacts::default();

        match bounded(page.screenshot_png()).await {
            Ok(png) => {
                captured.screenshot = self.write(format!("{stem}.png"), &png).await;
            }
            Err(e) => tracing::warn!(label, error = %e, "screenshot capture failed"),
        }

        match bounded(page.content()).await {
            Ok(html) => {
                captured.html = self.write(format!("{stem}.html"), html.as_bytes()).await;
            }
            Err(e) => tracing::warn!(label, error = %e, "DOM capture failed"),
        }

        if captured.screenshot.is_some() || captured.html.is_some() {
            tracing::info!(
                label,
                screenshot = ?captured.screenshot,
                html = ?captured.html,
                "captured failure diagnostics"
            );
        }
        captured
    }

    async fn write(&self, name: String, bytes: &[u8]) -> Option<PathBuf> {
        let path = self.dir.join(name);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to write diagnostics artifact");
                None
            }
        }
    }
}

async fn bounded<T>(
    call: impl std::future::Future<Output = Result<T, BrowserError>>,
) -> Result<T, BrowserError> {
    tokio::time::timeout(CAPTURE_TIMEOUT, call)
        .await
        .unwrap_or_else(|_| Err(BrowserError::Command("capture timed out".to_owned())))
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
