//! Rendering of JavaScript-driven pages through a headless Chrome session
//!
//! Every call to [`Renderer::render`] launches its own browser, drives the page
//! with one [`LoadStrategy`] and closes the browser again before returning,
//! whether or not the page could be loaded. The strategies drive a `Session` trait,
//! so the lifecycle can be exercised without a browser.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Path segment identifying the primary program's awards pages
pub const AWARDS_PATH: &str = "grammy.com/awards";

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const BODY_SCRIPT: &str = "document.body.innerHTML";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// How a page is driven until all of its content has loaded
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStrategy {
    /// Click a "show more" control until it disappears or the budget runs out
    ClickExpand {
        xpath: String,
        max_clicks: u32,
        settle: Duration,
        wait: Duration,
    },
    /// Scroll to the bottom repeatedly to trigger lazy loading
    ScrollToEnd { max_scrolls: u32, pause: Duration },
    /// Load and wait, no interaction
    SimpleLoad { settle: Duration },
}

impl LoadStrategy {
    pub fn click_expand(xpath: &str) -> Self {
        LoadStrategy::ClickExpand {
            xpath: xpath.to_string(),
            max_clicks: 18,
            settle: Duration::from_secs(7),
            wait: Duration::from_secs(10),
        }
    }

    pub fn scroll_to_end() -> Self {
        LoadStrategy::ScrollToEnd {
            max_scrolls: 50,
            pause: Duration::from_millis(500),
        }
    }

    pub fn simple_load() -> Self {
        LoadStrategy::SimpleLoad {
            settle: Duration::from_secs(5),
        }
    }

    /// Strategy for a URL: the awards listing is expanded by clicking, single
    /// ceremony pages are loaded as-is, anything else is scrolled to the end
    pub fn for_url(url: &str, show_more_xpath: &str) -> Self {
        if url.contains(AWARDS_PATH) {
            if url.matches("awards").count() > 1 {
                LoadStrategy::simple_load()
            } else {
                LoadStrategy::click_expand(show_more_xpath)
            }
        } else {
            LoadStrategy::scroll_to_end()
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoadStrategy::ClickExpand { .. } => "click-expand",
            LoadStrategy::ScrollToEnd { .. } => "scroll-to-end",
            LoadStrategy::SimpleLoad { .. } => "simple-load",
        }
    }
}

/// Why a page could not be rendered
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("interaction with {url} failed: {reason}")]
    Interaction { url: String, reason: String },

    #[error("could not read rendered document of {url}: {reason}")]
    Document { url: String, reason: String },

    #[error("browser runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Fully loaded markup of one page
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Turns a URL into rendered HTML
pub trait Renderer {
    fn render(&self, url: &str, strategy: &LoadStrategy) -> Result<RenderedPage, RenderError>;
}

/// Browser options
#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    /// Chrome/Chromium executable; autodetected when `None`
    pub chrome: Option<PathBuf>,
    pub headful: bool,
}

/// [`Renderer`] backed by a fresh chromiumoxide browser per call
pub struct ChromeRenderer {
    settings: BrowserSettings,
    runtime: tokio::runtime::Runtime,
}

impl ChromeRenderer {
    pub fn new(settings: BrowserSettings) -> Result<Self, RenderError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { settings, runtime })
    }

    fn browser_config(&self) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder();
        if let Some(chrome) = &self.settings.chrome {
            builder = builder.chrome_executable(chrome);
        }
        if self.settings.headful {
            builder = builder.with_head();
        }
        builder.build().map_err(RenderError::Launch)
    }

    async fn render_async(
        &self,
        url: &str,
        strategy: &LoadStrategy,
    ) -> Result<RenderedPage, RenderError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromeSession {
            browser,
            events,
            page: None,
            url: url.to_string(),
        };
        render_in(&mut session, url, strategy)
            .await
            .map(|html| RenderedPage {
                url: url.to_string(),
                html,
            })
    }
}

impl Renderer for ChromeRenderer {
    fn render(&self, url: &str, strategy: &LoadStrategy) -> Result<RenderedPage, RenderError> {
        info!("Rendering {} ({})", url, strategy.name());
        self.runtime.block_on(self.render_async(url, strategy))
    }
}

/// One open browser tab, as driven by the load strategies
trait Session {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;
    async fn has_element(&mut self, xpath: &str) -> Result<bool, RenderError>;
    async fn click(&mut self, xpath: &str) -> Result<(), RenderError>;
    async fn scroll_to_end(&mut self) -> Result<(), RenderError>;
    async fn html(&mut self) -> Result<String, RenderError>;
    async fn close(&mut self);
}

/// Drive the session with `strategy` and close it, whether or not driving
/// succeeded
async fn render_in<S: Session>(
    session: &mut S,
    url: &str,
    strategy: &LoadStrategy,
) -> Result<String, RenderError> {
    let result = drive(session, url, strategy).await;
    session.close().await;
    result
}

async fn drive<S: Session>(
    session: &mut S,
    url: &str,
    strategy: &LoadStrategy,
) -> Result<String, RenderError> {
    session.navigate(url).await?;

    match strategy {
        LoadStrategy::ClickExpand {
            xpath,
            max_clicks,
            settle,
            wait,
        } => {
            let clicks = expand(session, xpath, *max_clicks, *settle, *wait).await?;
            debug!("{} expanded with {} clicks", url, clicks);
        }
        LoadStrategy::ScrollToEnd { max_scrolls, pause } => {
            for _ in 0..*max_scrolls {
                session.scroll_to_end().await?;
                tokio::time::sleep(*pause).await;
            }
        }
        LoadStrategy::SimpleLoad { settle } => {
            tokio::time::sleep(*settle).await;
        }
    }

    session.html().await
}

/// Click the control until it stops showing up or `max_clicks` is spent.
/// Returns the number of clicks made.
async fn expand<S: Session>(
    session: &mut S,
    xpath: &str,
    max_clicks: u32,
    settle: Duration,
    wait: Duration,
) -> Result<u32, RenderError> {
    for click in 0..max_clicks {
        if !wait_for(session, xpath, wait).await? {
            debug!("{} gone after {} clicks, page fully expanded", xpath, click);
            return Ok(click);
        }
        session.click(xpath).await?;
        tokio::time::sleep(settle).await;
    }
    Ok(max_clicks)
}

/// Poll for the element until `wait` elapses; false when it never shows up
async fn wait_for<S: Session>(
    session: &mut S,
    xpath: &str,
    wait: Duration,
) -> Result<bool, RenderError> {
    let deadline = Instant::now() + wait;
    loop {
        if session.has_element(xpath).await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// JavaScript expression resolving an XPath to its first node
fn xpath_node(xpath: &str) -> String {
    let literal = serde_json::to_string(xpath).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
        literal
    )
}

struct ChromeSession {
    browser: Browser,
    events: tokio::task::JoinHandle<()>,
    page: Option<Page>,
    url: String,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page.as_ref().ok_or_else(|| RenderError::Navigation {
            url: self.url.clone(),
            reason: "no page open".to_string(),
        })
    }

    fn interaction(&self, reason: impl ToString) -> RenderError {
        RenderError::Interaction {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }

    fn document(&self, reason: impl ToString) -> RenderError {
        RenderError::Document {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Session for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.page = Some(page);
        Ok(())
    }

    async fn has_element(&mut self, xpath: &str) -> Result<bool, RenderError> {
        let script = format!("{} !== null", xpath_node(xpath));
        let result = self
            .page()?
            .evaluate(script.as_str())
            .await
            .map_err(|e| self.interaction(e))?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }

    async fn click(&mut self, xpath: &str) -> Result<(), RenderError> {
        let script = format!("{}.click()", xpath_node(xpath));
        self.page()?
            .evaluate(script.as_str())
            .await
            .map_err(|e| self.interaction(e))?;
        Ok(())
    }

    async fn scroll_to_end(&mut self) -> Result<(), RenderError> {
        self.page()?
            .evaluate(SCROLL_SCRIPT)
            .await
            .map_err(|e| self.interaction(e))?;
        Ok(())
    }

    async fn html(&mut self) -> Result<String, RenderError> {
        let result = self
            .page()?
            .evaluate(BODY_SCRIPT)
            .await
            .map_err(|e| self.document(e))?;
        result.into_value::<String>().map_err(|e| self.document(e))
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser for {}: {}", self.url, e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process for {} did not exit cleanly: {}", self.url, e);
        }
        self.events.abort();
    }
}
