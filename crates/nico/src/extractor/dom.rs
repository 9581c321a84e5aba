use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::endpoints::Endpoints;
use super::error::ExtractorError;
use super::resolver::VideoResolver;
use crate::media::VideoInfo;
use crate::session::{Credentials, DEFAULT_UA};

const MAIL_INPUT: &str = "#input__mailtel";
const PASSWORD_INPUT: &str = "#input__password";
const SUBMIT_BUTTON: &str = "#login__submit";
const VIDEO_ELEMENT: &str = ".MainVideoPlayer video";
const TITLE_ELEMENT: &str = ".VideoTitle";

/// Browser settings for [`DomResolver`].
#[derive(Debug, Clone)]
pub struct DomConfig {
    /// Browser binary; chromiumoxide's lookup is used when unset.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// How long element lookups keep polling after navigation.
    /// `Duration::ZERO` means one immediate attempt.
    pub render_wait: Duration,
    pub poll_interval: Duration,
    pub endpoints: Endpoints,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            render_wait: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            endpoints: Endpoints::default(),
        }
    }
}

#[derive(Clone, Copy)]
enum Read<'a> {
    Attribute(&'a str),
    Text,
}

/// Resolver that logs in and reads the watch page through a real browser.
///
/// The browser process is owned by this value. Call [`DomResolver::close`]
/// when done; it is safe to call more than once.
pub struct DomResolver {
    browser: Mutex<Option<Browser>>,
    handler: Option<JoinHandle<()>>,
    page: Option<Page>,
    config: DomConfig,
    credentials: Credentials,
}

impl DomResolver {
    /// Start the browser, open a tab and log in through the login form.
    ///
    /// If anything fails after the browser started, it is shut down before
    /// the error is returned.
    pub async fn launch(
        credentials: Credentials,
        config: DomConfig,
    ) -> Result<Self, ExtractorError> {
        let mut resolver = Self::detached(credentials, config);
        match resolver.start().await {
            Ok(()) => Ok(resolver),
            Err(e) => {
                resolver.close().await;
                Err(e)
            }
        }
    }

    fn detached(credentials: Credentials, config: DomConfig) -> Self {
        Self {
            browser: Mutex::new(None),
            handler: None,
            page: None,
            config,
            credentials,
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ExtractorError> {
        let mut builder = BrowserConfig::builder().arg(format!("--user-agent={DEFAULT_UA}"));
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(ExtractorError::Driver)
    }

    async fn start(&mut self) -> Result<(), ExtractorError> {
        let browser_config = self.browser_config()?;
        info!(headless = self.config.headless, "Starting browser");
        let (browser, mut handler) = Browser::launch(browser_config).await?;

        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser event error");
                }
            }
        }));

        let page = browser.new_page("about:blank").await;
        *self.browser.get_mut() = Some(browser);
        self.page = Some(page?);

        self.login().await
    }

    fn page(&self) -> Result<&Page, ExtractorError> {
        self.page
            .as_ref()
            .ok_or_else(|| ExtractorError::driver("browser page is closed"))
    }

    async fn login(&self) -> Result<(), ExtractorError> {
        let page = self.page()?;
        info!(identifier = %self.credentials.identifier(), "Logging in through the browser");
        page.goto(self.config.endpoints.account_login.as_str()).await?;

        fill(page, MAIL_INPUT, self.credentials.identifier()).await?;
        fill(page, PASSWORD_INPUT, self.credentials.secret()).await?;
        page.find_element(SUBMIT_BUTTON)
            .await
            .map_err(|e| ExtractorError::driver(format!("{SUBMIT_BUTTON}: {e}")))?
            .click()
            .await?;
        page.wait_for_navigation().await?;
        debug!("Login form submitted");
        Ok(())
    }

    async fn read_rendered(
        &self,
        page: &Page,
        selector: &str,
        read: Read<'_>,
    ) -> Result<String, ExtractorError> {
        let poll = RenderPoll::new(
            Instant::now(),
            self.config.render_wait,
            self.config.poll_interval,
        );
        loop {
            let attempt = async {
                let element = page.find_element(selector).await?;
                match read {
                    Read::Attribute(name) => element.attribute(name).await,
                    Read::Text => element.inner_text().await,
                }
            }
            .await;

            let last_error = match rendered_value(attempt) {
                Ok(value) => return Ok(value),
                Err(reason) => reason,
            };

            let Some(delay) = poll.next_delay(Instant::now()) else {
                return Err(ExtractorError::driver(format!("{selector}: {last_error}")));
            };
            debug!(selector, error = %last_error, "Element not rendered yet");
            tokio::time::sleep(delay).await;
        }
    }

    /// Close the tab and stop the browser. Missing parts are skipped.
    pub async fn close(&mut self) {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            warn!(error = %e, "Failed to close browser page");
        }

        if let Some(mut browser) = self.browser.get_mut().take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Failed to close browser");
            }
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "Failed to wait for browser exit");
            }
            debug!("Browser stopped");
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.page.is_none() && self.handler.is_none()
    }
}

/// Retry budget for reading an element that may not be rendered yet.
#[derive(Debug, Clone, Copy)]
struct RenderPoll {
    deadline: Instant,
    interval: Duration,
}

impl RenderPoll {
    fn new(started: Instant, budget: Duration, interval: Duration) -> Self {
        Self {
            deadline: started + budget,
            interval,
        }
    }

    /// Delay before the next attempt, `None` once the budget is spent.
    /// The delay never runs past the deadline.
    fn next_delay(&self, now: Instant) -> Option<Duration> {
        let remaining = self.deadline.saturating_duration_since(now);
        if remaining.is_zero() {
            None
        } else {
            Some(self.interval.min(remaining))
        }
    }
}

/// A read counts only when it produced non-blank text; anything else is
/// the reason to retry.
fn rendered_value<E: std::fmt::Display>(
    attempt: Result<Option<String>, E>,
) -> Result<String, String> {
    match attempt {
        Ok(Some(value)) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err("element has no value yet".to_owned()),
        Err(e) => Err(e.to_string()),
    }
}

async fn fill(page: &Page, selector: &str, text: &str) -> Result<(), ExtractorError> {
    let element = page
        .find_element(selector)
        .await
        .map_err(|e| ExtractorError::driver(format!("{selector}: {e}")))?;
    element.click().await?;
    element.type_str(text).await?;
    Ok(())
}

#[async_trait]
impl VideoResolver for DomResolver {
    fn name(&self) -> &'static str {
        "dom"
    }

    async fn resolve(&self, video_id: &str) -> Result<VideoInfo, ExtractorError> {
        let page = self.page()?;
        let url = self.config.endpoints.watch_url(video_id);
        info!(video_id, url = %url, "Opening watch page");
        page.goto(url.as_str()).await?;

        let src = self
            .read_rendered(page, VIDEO_ELEMENT, Read::Attribute("src"))
            .await?;
        let title = self.read_rendered(page, TITLE_ELEMENT, Read::Text).await?;
        debug!(video_id, src = %src, "Read video element");

        Ok(VideoInfo::new(src, title.trim()))
    }
}

impl Drop for DomResolver {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
