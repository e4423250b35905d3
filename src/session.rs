//! Browser session handle for the inspection run.
//!
//! Wraps a chromiumoxide (CDP) browser: launch with emulated mobile
//! metrics, capture page console output into an append-only diagnostic
//! log, watch network traffic for quiescence, locate and click controls,
//! and write milestone screenshots. One session owns one browser process
//! and its single page for the whole run.

use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFailed, EventLoadingFinished,
    EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::{
    EnableParams as RuntimeEnableParams, EventConsoleApiCalled,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures_util::StreamExt;
use futures_util::stream;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;

/// Failure classes of a session. None of these are retried; every one
/// aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed")]
    Navigation {
        url: String,
        #[source]
        source: CdpError,
    },

    #[error("network never went quiet within {deadline_ms}ms")]
    QuiescenceTimeout { deadline_ms: u64 },

    #[error("expected control not found: {wanted}")]
    ElementNotFound { wanted: String },

    #[error("cdp error: {0}")]
    Cdp(#[from] CdpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One page-emitted console message, tagged with its severity/category.
#[derive(Debug, Clone)]
pub struct ConsoleRecord {
    pub level: String,
    pub text: String,
}

impl ConsoleRecord {
    fn from_event(event: &EventConsoleApiCalled) -> Self {
        let level = format!("{:?}", event.r#type).to_lowercase();
        let text = event
            .args
            .iter()
            .map(|arg| render_remote_value(arg.value.as_ref(), arg.description.as_deref()))
            .collect::<Vec<_>>()
            .join(" ");
        Self { level, text }
    }
}

impl fmt::Display for ConsoleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.text)
    }
}

/// Render one console argument the way devtools would show it: plain
/// strings verbatim, everything else as JSON, falling back to the CDP
/// description for values that don't serialize (functions, DOM nodes).
fn render_remote_value(value: Option<&serde_json::Value>, description: Option<&str>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => description.unwrap_or("<object>").to_string(),
    }
}

/// Exclusively-owned handle over the browser process and its single page.
/// Valid between [`InspectionSession::launch`] and
/// [`InspectionSession::close`]; the driver guarantees close runs on every
/// exit path.
pub struct InspectionSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    console_task: JoinHandle<()>,
    network_task: JoinHandle<()>,
    diagnostics: Arc<Mutex<Vec<ConsoleRecord>>>,
    last_network_activity: Arc<Mutex<Instant>>,
    idle_window: Duration,
    quiescence_deadline_ms: u64,
    lookup_deadline: Duration,
}

impl InspectionSession {
    /// Launch the browser and prepare the page: emulated mobile metrics
    /// applied and the console subscription active before any navigation,
    /// so early messages are not missed.
    pub async fn launch(config: &Config) -> Result<Self, SessionError> {
        let mut builder =
            BrowserConfig::builder().window_size(config.viewport.width, config.viewport.height);
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        // The handler must be drained for the browser to function at all.
        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = browser.new_page("about:blank").await?;

        page.execute(
            SetDeviceMetricsOverrideParams::builder()
                .width(config.viewport.width as i64)
                .height(config.viewport.height as i64)
                .device_scale_factor(config.viewport.device_scale_factor)
                .mobile(true)
                .build()
                .map_err(SessionError::Launch)?,
        )
        .await?;

        page.execute(RuntimeEnableParams::default()).await?;
        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let mut console_events = page.event_listener::<EventConsoleApiCalled>().await?;
        let log = diagnostics.clone();
        let console_task = tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let record = ConsoleRecord::from_event(&event);
                log.lock().await.push(record);
            }
        });

        page.execute(NetworkEnableParams::default()).await?;
        let requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let finished = page.event_listener::<EventLoadingFinished>().await?;
        let failed = page.event_listener::<EventLoadingFailed>().await?;
        let last_network_activity = Arc::new(Mutex::new(Instant::now()));
        let stamp = last_network_activity.clone();
        let network_task = tokio::spawn(async move {
            let mut activity = stream::select(
                requests.map(|event| Some(event.request.url.clone())),
                stream::select(
                    finished.map(|_| None::<String>),
                    failed.map(|_| None::<String>),
                ),
            );
            while let Some(url) = activity.next().await {
                if let Some(url) = url {
                    debug!(%url, "network request");
                }
                *stamp.lock().await = Instant::now();
            }
        });

        Ok(Self {
            browser,
            page,
            handler_task,
            console_task,
            network_task,
            diagnostics,
            last_network_activity,
            idle_window: Duration::from_millis(config.quiescence.idle_ms),
            quiescence_deadline_ms: config.quiescence.deadline_ms,
            lookup_deadline: Duration::from_millis(config.lookup_deadline_ms),
        })
    }

    /// Navigate to `url` and block until the network goes quiet.
    pub async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        *self.last_network_activity.lock().await = Instant::now();
        self.page
            .goto(url)
            .await
            .map_err(|source| SessionError::Navigation {
                url: url.to_string(),
                source,
            })?;
        self.wait_for_quiescence().await
    }

    /// Full page reload, then block until the network goes quiet.
    pub async fn reload(&self) -> Result<(), SessionError> {
        *self.last_network_activity.lock().await = Instant::now();
        self.page.reload().await?;
        self.wait_for_quiescence().await
    }

    /// Block until no network activity has arrived for the trailing idle
    /// window. A server that never goes quiet fails with
    /// [`SessionError::QuiescenceTimeout`] once the overall deadline
    /// elapses, instead of hanging the run forever.
    pub async fn wait_for_quiescence(&self) -> Result<(), SessionError> {
        let started = Instant::now();
        let deadline = Duration::from_millis(self.quiescence_deadline_ms);
        loop {
            let last = *self.last_network_activity.lock().await;
            if last.elapsed() >= self.idle_window {
                return Ok(());
            }
            if started.elapsed() >= deadline {
                return Err(SessionError::QuiescenceTimeout {
                    deadline_ms: self.quiescence_deadline_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Screenshot the page as PNG into `path`, overwriting any prior file.
    pub async fn capture(&self, path: &Path) -> Result<(), SessionError> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await?;
        tokio::fs::write(path, &bytes).await?;
        debug!(path = %path.display(), "screenshot written");
        Ok(())
    }

    /// Poll for a `button` whose visible text contains `label`. Absence
    /// after the lookup deadline is an explicit failure, never a silent
    /// skip.
    pub async fn find_labeled_button(&self, label: &str) -> Result<Element, SessionError> {
        let deadline = Instant::now() + self.lookup_deadline;
        loop {
            let buttons = self.page.find_elements("button").await.unwrap_or_default();
            for button in buttons {
                if let Ok(Some(text)) = button.inner_text().await {
                    if text.contains(label) {
                        return Ok(button);
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(SessionError::ElementNotFound {
                    wanted: format!("button labeled \"{label}\""),
                });
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Poll for the positional first `button` in the document. Index 0 is
    /// all the target app offers to identify an option control, ordering
    /// instability included.
    pub async fn first_button(&self) -> Result<Element, SessionError> {
        let deadline = Instant::now() + self.lookup_deadline;
        loop {
            if let Ok(buttons) = self.page.find_elements("button").await {
                if let Some(button) = buttons.into_iter().next() {
                    return Ok(button);
                }
            }
            if Instant::now() >= deadline {
                return Err(SessionError::ElementNotFound {
                    wanted: "button at index 0".to_string(),
                });
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Snapshot of the diagnostic log, in arrival order.
    pub async fn diagnostics(&self) -> Vec<ConsoleRecord> {
        self.diagnostics.lock().await.clone()
    }

    /// Close the browser and release every associated resource. Safe to
    /// call after failures; logs instead of erroring so it can run on
    /// every exit path.
    pub async fn close(mut self) {
        self.console_task.abort();
        self.network_task.abort();
        if let Err(error) = self.browser.close().await {
            warn!(%error, "browser did not close cleanly");
        }
        self.handler_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_plain_string_verbatim() {
        let value = json!("navigation start");
        assert_eq!(render_remote_value(Some(&value), None), "navigation start");
    }

    #[test]
    fn test_render_structured_value_as_json() {
        let value = json!({"route": "/question", "ms": 42});
        let rendered = render_remote_value(Some(&value), None);
        assert!(rendered.contains("\"route\""));
        assert!(rendered.contains("42"));
    }

    #[test]
    fn test_render_falls_back_to_description() {
        assert_eq!(
            render_remote_value(None, Some("HTMLButtonElement")),
            "HTMLButtonElement"
        );
        assert_eq!(render_remote_value(None, None), "<object>");
    }

    #[test]
    fn test_console_record_display_matches_arrival_format() {
        let record = ConsoleRecord {
            level: "error".to_string(),
            text: "hydration mismatch".to_string(),
        };
        assert_eq!(record.to_string(), "[error] hydration mismatch");
    }

    #[test]
    fn test_element_not_found_names_the_control() {
        let err = SessionError::ElementNotFound {
            wanted: "button labeled \"테스트 시작하기\"".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("not found"));
        assert!(message.contains("테스트 시작하기"));
    }

    #[test]
    fn test_quiescence_timeout_reports_deadline() {
        let err = SessionError::QuiescenceTimeout { deadline_ms: 30_000 };
        assert!(err.to_string().contains("30000ms"));
    }
}
