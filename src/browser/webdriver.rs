//! Chrome sessions over a spawned chromedriver, driven with `fantoccini`.

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tokio::process::{Child, Command};

use super::{BrowserLauncher, BrowserSession, POLL_INTERVAL};
use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

const STARTUP_ATTEMPTS: usize = 50;
const STARTUP_POLL: Duration = Duration::from_millis(100);

/// Browser window and timeout settings.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub window_width: u32,
    pub window_height: u32,
    pub page_load_timeout: Duration,
}

impl From<&CrawlerConfig> for BrowserOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            window_width: config.window_width,
            window_height: config.window_height,
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
        }
    }
}

impl BrowserOptions {
    fn chrome_args(&self, headless: bool) -> Vec<String> {
        let mut args = Vec::new();
        if headless {
            args.push("--headless=new".to_string());
        }
        args.push(format!(
            "--window-size={},{}",
            self.window_width, self.window_height
        ));
        args.extend(
            ["--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu"]
                .into_iter()
                .map(String::from),
        );
        args
    }

    /// W3C capabilities; the client wraps them in `alwaysMatch`.
    fn capabilities(&self, headless: bool) -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert("browserName".into(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".into(),
            json!({ "args": self.chrome_args(headless) }),
        );
        caps.insert(
            "timeouts".into(),
            json!({ "pageLoad": self.page_load_timeout.as_millis() as u64 }),
        );
        caps
    }
}

/// Launches Chrome sessions through a chromedriver binary.
pub struct ChromeDriverLauncher {
    driver_path: PathBuf,
    options: BrowserOptions,
}

impl ChromeDriverLauncher {
    pub fn new(driver_path: PathBuf, options: BrowserOptions) -> Result<Self> {
        if !driver_path.is_file() {
            return Err(AppError::Driver(driver_path.display().to_string()));
        }
        Ok(Self {
            driver_path,
            options,
        })
    }

    /// Open a session once chromedriver accepts connections.
    async fn connect(&self, url: &str, headless: bool) -> Result<Client> {
        let mut builder = ClientBuilder::rustls()
            .map_err(|e| AppError::browser(format!("TLS setup failed: {e}")))?;
        builder.capabilities(self.options.capabilities(headless));

        let mut last_error = String::new();
        for _ in 0..STARTUP_ATTEMPTS {
            match builder.connect(url).await {
                Ok(client) => return Ok(client),
                Err(e) => last_error = e.to_string(),
            }
            tokio::time::sleep(STARTUP_POLL).await;
        }
        Err(AppError::browser(format!(
            "chromedriver session could not be started: {last_error}"
        )))
    }
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[async_trait]
impl BrowserLauncher for ChromeDriverLauncher {
    async fn open(&self, headless: bool) -> Result<Box<dyn BrowserSession>> {
        let port = free_port()?;
        let child = Command::new(&self.driver_path)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::Driver(format!("{}: {}", self.driver_path.display(), e))
            })?;

        let client = self
            .connect(&format!("http://127.0.0.1:{port}"), headless)
            .await?;
        log::debug!("WebDriver session on port {port}");
        Ok(Box::new(WebDriverSession {
            client: Some(client),
            child: Some(child),
        }))
    }
}

struct WebDriverSession {
    client: Option<Client>,
    child: Option<Child>,
}

impl WebDriverSession {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::browser("session already closed"))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.client()?.goto(url).await.map_err(AppError::browser)
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self.client()?.current_url().await.map_err(AppError::browser)?;
        Ok(url.to_string())
    }

    async fn page_source(&mut self) -> Result<String> {
        self.client()?.source().await.map_err(AppError::browser)
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        let started = std::time::Instant::now();
        loop {
            let found = self
                .client()?
                .find_all(Locator::Css(selector))
                .await
                .map_err(AppError::browser)?;
            if !found.is_empty() {
                return Ok(true);
            }
            if started.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) -> Result<()> {
        let closed = match self.client.take() {
            Some(client) => client.close().await.map_err(AppError::browser),
            None => Ok(()),
        };
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
        closed
    }
}
