//! Browser automation seam.
//!
//! The crawler only needs a handful of capabilities from a browser: load a
//! URL, report where it ended up, hand back the rendered markup, and wait for
//! an element. [`BrowserSession`] captures exactly that so site extractors can
//! be driven by a real WebDriver session or by canned pages in tests.

mod driver;
mod webdriver;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::Html;

use crate::error::Result;
use crate::utils::{normalize_whitespace, parse_selector};

pub use driver::{DRIVER_PATH_FILE, find_configured_driver, install_driver, resolve_driver_path};
pub use webdriver::{BrowserOptions, ChromeDriverLauncher};

/// Interval between element polls in [`BrowserSession::wait_for`].
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Snapshot of one element matched by a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Visible text with whitespace collapsed
    pub text: String,
    pub attrs: HashMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Select elements from markup.
pub fn select_elements(markup: &str, selector: &str) -> Result<Vec<Element>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(markup);
    Ok(document
        .select(&selector)
        .map(|el| Element {
            text: normalize_whitespace(&el.text().collect::<String>()),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
        .collect())
}

/// A live browser tab.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load a URL and wait for the page load to finish.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the current page after redirects.
    async fn current_url(&mut self) -> Result<String>;

    /// Rendered markup of the current page.
    async fn page_source(&mut self) -> Result<String>;

    /// Elements on the current page matching a CSS selector.
    async fn find(&mut self, selector: &str) -> Result<Vec<Element>> {
        let source = self.page_source().await?;
        select_elements(&source, selector)
    }

    /// Wait until at least one element matches; `false` on timeout.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        let started = Instant::now();
        loop {
            if !self.find(selector).await?.is_empty() {
                return Ok(true);
            }
            if started.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// End the session and release the browser.
    async fn close(&mut self) -> Result<()>;
}

/// Opens browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self, headless: bool) -> Result<Box<dyn BrowserSession>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned-page browser used by extractor and controller tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::AppError;

    /// Shared record of what a fake session did.
    #[derive(Debug, Default)]
    pub struct Journal {
        pub visited: Vec<String>,
        pub opened: usize,
        pub closed: usize,
        pub headless: Option<bool>,
    }

    /// Serves fixed markup per URL; unknown URLs fail to load.
    #[derive(Clone, Default)]
    pub struct FakeBrowser {
        pages: Arc<HashMap<String, String>>,
        pub journal: Arc<Mutex<Journal>>,
    }

    impl FakeBrowser {
        pub fn new(pages: impl IntoIterator<Item = (String, String)>) -> Self {
            Self {
                pages: Arc::new(pages.into_iter().collect()),
                journal: Arc::default(),
            }
        }

        pub fn session(&self) -> FakeSession {
            FakeSession {
                pages: Arc::clone(&self.pages),
                journal: Arc::clone(&self.journal),
                current: None,
            }
        }

        pub fn visited(&self) -> Vec<String> {
            self.journal.lock().unwrap().visited.clone()
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeBrowser {
        async fn open(&self, headless: bool) -> Result<Box<dyn BrowserSession>> {
            {
                let mut journal = self.journal.lock().unwrap();
                journal.opened += 1;
                journal.headless = Some(headless);
            }
            Ok(Box::new(self.session()))
        }
    }

    pub struct FakeSession {
        pages: Arc<HashMap<String, String>>,
        journal: Arc<Mutex<Journal>>,
        current: Option<String>,
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            self.journal.lock().unwrap().visited.push(url.to_string());
            if !self.pages.contains_key(url) {
                return Err(AppError::browser(format!("no page for {url}")));
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        async fn current_url(&mut self) -> Result<String> {
            self.current
                .clone()
                .ok_or_else(|| AppError::browser("nothing loaded"))
        }

        async fn page_source(&mut self) -> Result<String> {
            let url = self.current_url().await?;
            Ok(self.pages.get(&url).cloned().unwrap_or_default())
        }

        async fn close(&mut self) -> Result<()> {
            self.journal.lock().unwrap().closed += 1;
            Ok(())
        }
    }
}
