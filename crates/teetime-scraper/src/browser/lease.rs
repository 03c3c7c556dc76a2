use std::time::Duration;

use super::{BrowserConnector, BrowserError, BrowserPage, Fingerprint};

/// Upper bound on how long releasing a page may take.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns one open browser page for the duration of a pipeline stage.
///
/// Call [`PageLease::release`] on the normal path. If the lease is dropped
/// while still holding its page (early return, panic, or the enclosing
/// future being cancelled) the close is spawned onto the current Tokio
/// runtime instead, so the remote session is released either way.
pub struct PageLease {
    page: Option<Box<dyn BrowserPage>>,
    stage: &'static str,
}

impl PageLease {
    /// # Errors
    ///
    /// Returns the connector's [`BrowserError`] when no page could be opened.
    pub async fn open(
        connector: &dyn BrowserConnector,
        fingerprint: &Fingerprint,
        stage: &'static str,
    ) -> Result<Self, BrowserError> {
        let page = connector.open_page(fingerprint).await?;
        tracing::debug!(stage, "browser page opened");
        Ok(Self {
            page: Some(page),
            stage,
        })
    }

    /// # Errors
    ///
    /// Returns [`BrowserError::Command`] if the lease was already released.
    pub fn page(&mut self) -> Result<&mut (dyn BrowserPage + 'static), BrowserError> {
        self.page
            .as_deref_mut()
            .ok_or_else(|| BrowserError::Command("page already released".to_owned()))
    }

    /// Close the page, waiting at most [`CLOSE_TIMEOUT`]. Failures are logged,
    /// never returned: by the time a lease is released the stage outcome is
    /// already decided.
    pub async fn release(mut self) {
        if let Some(page) = self.page.take() {
            close_page(page, self.stage).await;
        }
    }
}

impl Drop for PageLease {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        let stage = self.stage;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close_page(page, stage));
            }
            Err(_) => {
                tracing::warn!(stage, "browser page dropped outside a runtime; session not closed");
            }
        }
    }
}

async fn close_page(mut page: Box<dyn BrowserPage>, stage: &'static str) {
    match tokio::time::timeout(CLOSE_TIMEOUT, page.close()).await {
        Ok(Ok(())) => tracing::debug!(stage, "browser page closed"),
        Ok(Err(e)) => tracing::warn!(stage, error = %e, "failed to close browser page"),
        Err(_) => tracing::warn!(stage, "timed out closing browser page"),
    }
}
