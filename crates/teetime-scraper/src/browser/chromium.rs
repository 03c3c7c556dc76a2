use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, Tab};
use tokio::sync::oneshot;

use super::{BrowserConnector, BrowserError, BrowserPage, Fingerprint};

/// Per-command bound inside the driver. The pipeline applies its own, tighter
/// timeouts on top; this one keeps abandoned blocking calls from lingering.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Connects to a remote Chromium over its DevTools websocket endpoint.
///
/// Every [`open_page`](BrowserConnector::open_page) call establishes a fresh
/// connection so that concurrent acquisitions never share a browser session.
/// `headless_chrome` is synchronous, so each command runs on the blocking
/// pool.
pub struct ChromiumConnector {
    ws_url: String,
}

impl ChromiumConnector {
    #[must_use]
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }
}

impl std::fmt::Debug for ChromiumConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumConnector")
            .field("ws_url", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl BrowserConnector for ChromiumConnector {
    async fn open_page(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let ws_url = self.ws_url.clone();
        let fingerprint = fingerprint.clone();
        let (tx, rx) = oneshot::channel();
        // The blocking open cannot be aborted. If the caller is gone by the
        // time it finishes, the tab is closed here instead of leaking.
        tokio::task::spawn_blocking(move || {
            let opened = open_tab(&ws_url, &fingerprint);
            hand_over(tx, opened, |opened| {
                if let Ok((_browser, tab)) = opened {
                    close_abandoned(&tab);
                }
            });
        });
        let (browser, tab) = rx
            .await
            .map_err(|_| BrowserError::Connect("browser open task exited".to_owned()))?
            .map_err(|e| BrowserError::Connect(redact(&format!("{e:#}"), &self.ws_url)))?;

        Ok(Box::new(ChromiumPage {
            _browser: Some(browser),
            tab: Some(tab),
            ws_url: self.ws_url.clone(),
        }))
    }
}

fn open_tab(ws_url: &str, fingerprint: &Fingerprint) -> anyhow::Result<(Browser, Arc<Tab>)> {
    let browser = Browser::connect(ws_url.to_owned())?;
    let tab = browser.new_tab()?;
    tab.set_default_timeout(COMMAND_TIMEOUT);

    if let Err(e) = tab.set_user_agent(
        &fingerprint.user_agent,
        Some(&fingerprint.accept_language),
        None,
    ) {
        if let Err(close_err) = tab.close(false) {
            tracing::warn!(error = %close_err, "failed to close half-open browser tab");
        }
        return Err(e);
    }

    // Remote pools may pin the window size; the fingerprint still holds.
    if let Err(e) = tab.set_bounds(Bounds::Normal {
        left: Some(0),
        top: Some(0),
        width: Some(f64::from(fingerprint.viewport_width)),
        height: Some(f64::from(fingerprint.viewport_height)),
    }) {
        tracing::debug!(error = %e, "viewport override rejected by remote browser");
    }

    Ok((browser, tab))
}

/// Send `value` to the waiting caller, or pass it to `discard` if the caller
/// has stopped listening.
fn hand_over<T>(tx: oneshot::Sender<T>, value: T, discard: impl FnOnce(T)) {
    if let Err(unclaimed) = tx.send(value) {
        discard(unclaimed);
    }
}

fn close_abandoned(tab: &Tab) {
    match tab.close(false) {
        Ok(_) => tracing::debug!("closed browser tab opened for a cancelled request"),
        Err(e) => tracing::warn!(error = %e, "failed to close abandoned browser tab"),
    }
}

struct ChromiumPage {
    /// Keeps the websocket connection alive for as long as the tab is used.
    _browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
    ws_url: String,
}

impl ChromiumPage {
    fn tab(&self) -> Result<Arc<Tab>, BrowserError> {
        self.tab
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| BrowserError::Command("page is closed".to_owned()))
    }
}

/// Run one synchronous driver call on the blocking pool.
async fn blocking<T, F>(
    tab: Arc<Tab>,
    ws_url: String,
    wrap: fn(String) -> BrowserError,
    call: F,
) -> Result<T, BrowserError>
where
    T: Send + 'static,
    F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&tab))
        .await
        .map_err(|e| BrowserError::Command(e.to_string()))?
        .map_err(|e| wrap(redact(&format!("{e:#}"), &ws_url)))
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let url = url.to_owned();
        blocking(
            self.tab()?,
            self.ws_url.clone(),
            BrowserError::Navigation,
            move |tab| {
                tab.navigate_to(&url)?.wait_until_navigated()?;
                Ok(())
            },
        )
        .await
    }

    async fn has_element(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let literal = serde_json::to_string(selector)
            .map_err(|e| BrowserError::Command(format!("unusable selector: {e}")))?;
        let expression = format!("document.querySelector({literal}) !== null");
        blocking(
            self.tab()?,
            self.ws_url.clone(),
            BrowserError::Command,
            move |tab| {
                let result = tab.evaluate(&expression, false)?;
                Ok(matches!(result.value, Some(serde_json::Value::Bool(true))))
            },
        )
        .await
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        blocking(
            self.tab()?,
            self.ws_url.clone(),
            BrowserError::Command,
            |tab| tab.get_content(),
        )
        .await
    }

    async fn screenshot_png(&mut self) -> Result<Vec<u8>, BrowserError> {
        blocking(
            self.tab()?,
            self.ws_url.clone(),
            BrowserError::Command,
            |tab| tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true),
        )
        .await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let Some(tab) = self.tab.take() else {
            return Ok(());
        };
        let result = blocking(tab, self.ws_url.clone(), BrowserError::Command, |tab| {
            tab.close(false)?;
            Ok(())
        })
        .await;
        // Dropping the browser handle closes the websocket session.
        self._browser = None;
        result
    }
}

/// Strip the endpoint, and any `token` it carries, from an error message.
fn redact(message: &str, ws_url: &str) -> String {
    let mut out = message.replace(ws_url, "[redacted]");
    if let Some(token) = ws_url
        .split_once('?')
        .map(|(_, query)| query)
        .into_iter()
        .flat_map(|query| query.split('&'))
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|token| !token.is_empty())
    {
        out = out.replace(token, "[redacted]");
    }
    out
}
