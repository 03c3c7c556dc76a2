//! Scripted in-memory browser shared by the integration tests.
//!
//! Every `open_page` call pops the next [`PageScript`]; running out of
//! scripts is reported as a connection failure. Shared counters track how
//! many pages were opened and closed so tests can assert that no remote
//! session leaks.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use teetime_scraper::{
    AcquisitionConfig, BrowserConnector, BrowserError, BrowserPage, Fingerprint,
};

pub const RESULTS_HTML: &str = r#"
<html><body>
<ul data-testid="search-results-list">
  <li data-testid="search-result">
    <h3 data-testid="facility-name">Dubsdread Golf Course</h3>
    <span data-testid="tee-time">7:10 AM</span>
    <span data-testid="display-amount">$45.00</span>
    <span data-testid="hole-count">18</span>
    <a href="/tee-times/facility/1234-dubsdread/search">Book</a>
  </li>
  <li data-testid="search-result">
    <h3 data-testid="facility-name">Winter Park 9</h3>
    <span data-testid="tee-time">8:00 AM</span>
    <a href="/tee-times/facility/55-winter-park/search">Book</a>
  </li>
</ul>
</body></html>
"#;

pub fn token_html(token: &str) -> String {
    format!(
        r#"<html><body><form id="search">
        <input type="hidden" name="__RequestVerificationToken" value="{token}" />
        </form></body></html>"#
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Ok,
    Hang,
    Fail,
}

#[derive(Debug, Clone)]
pub struct PageScript {
    pub connect_fails: bool,
    /// `open_page` never resolves.
    pub connect_hangs: bool,
    pub navigation: Navigation,
    pub html: String,
    pub results_rendered: bool,
}

impl PageScript {
    pub fn token(token: &str) -> Self {
        Self {
            connect_fails: false,
            connect_hangs: false,
            navigation: Navigation::Ok,
            html: token_html(token),
            results_rendered: false,
        }
    }

    pub fn results() -> Self {
        Self {
            connect_fails: false,
            connect_hangs: false,
            navigation: Navigation::Ok,
            html: RESULTS_HTML.to_owned(),
            results_rendered: true,
        }
    }

    /// Loads fine but carries neither a token nor results.
    pub fn blocked() -> Self {
        Self {
            connect_fails: false,
            connect_hangs: false,
            navigation: Navigation::Ok,
            html: "<html><body>Access denied</body></html>".to_owned(),
            results_rendered: false,
        }
    }

    pub fn connect_failure() -> Self {
        Self {
            connect_fails: true,
            ..Self::blocked()
        }
    }

    pub fn connect_hang() -> Self {
        Self {
            connect_hangs: true,
            ..Self::blocked()
        }
    }

    #[must_use]
    pub fn with_navigation(mut self, navigation: Navigation) -> Self {
        self.navigation = navigation;
        self
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigated: Mutex<Vec<String>>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigated(&self) -> Vec<String> {
        self.navigated.lock().unwrap().clone()
    }
}

pub struct FakeBrowser {
    scripts: Mutex<VecDeque<PageScript>>,
    /// Served once the queue is empty, if set.
    repeat: Option<PageScript>,
    pub counters: Arc<Counters>,
}

impl FakeBrowser {
    pub fn new(scripts: impl IntoIterator<Item = PageScript>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            repeat: None,
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn repeating(script: PageScript) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            repeat: Some(script),
            counters: Arc::new(Counters::default()),
        })
    }
}

#[async_trait]
impl BrowserConnector for FakeBrowser {
    async fn open_page(
        &self,
        _fingerprint: &Fingerprint,
    ) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| BrowserError::Connect("no scripted page left".to_owned()))?;
        if script.connect_hangs {
            std::future::pending::<()>().await;
        }
        if script.connect_fails {
            return Err(BrowserError::Connect("connection refused".to_owned()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            script,
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }
}

struct FakePage {
    script: PageScript,
    counters: Arc<Counters>,
    closed: bool,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.counters.navigated.lock().unwrap().push(url.to_owned());
        match self.script.navigation {
            Navigation::Ok => Ok(()),
            Navigation::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Navigation::Fail => Err(BrowserError::Navigation("net::ERR_CONNECTION_RESET".to_owned())),
        }
    }

    async fn has_element(&mut self, _selector: &str) -> Result<bool, BrowserError> {
        Ok(self.script.results_rendered)
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        Ok(self.script.html.clone())
    }

    async fn screenshot_png(&mut self) -> Result<Vec<u8>, BrowserError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Short timeouts against a local upstream.
pub fn test_config(base_url: &str) -> AcquisitionConfig {
    AcquisitionConfig {
        upstream_base_url: base_url.to_owned(),
        navigation_timeout: Duration::from_millis(500),
        results_timeout: Duration::from_millis(300),
        api_timeout: Duration::from_secs(2),
        api_path_budget: Duration::from_secs(3),
        poll_interval: Duration::from_millis(20),
        ..AcquisitionConfig::default()
    }
}

/// Give spawned page closes a chance to run.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
}
