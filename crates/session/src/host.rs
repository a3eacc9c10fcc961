//! The single shared browser instance.
//!
//! Sessions never own a browser process; they carve isolated browsing
//! contexts (own cookie/storage partition, CDP `Target.createBrowserContext`)
//! out of the one instance held here.

use std::time::Duration;

use {
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Page,
        cdp::browser_protocol::{
            browser::BrowserContextId,
            target::{CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams},
        },
    },
    futures::StreamExt,
    tokio::{sync::Mutex, task::JoinHandle},
    tracing::{debug, info, warn},
};

use crate::{
    detect,
    error::{Result, SessionError},
    types::LaunchOptions,
};

pub struct BrowserHost {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    wait_timeout: Duration,
}

impl BrowserHost {
    /// Launch the shared Chromium instance.
    ///
    /// The executable comes from the configured path when set, otherwise from
    /// auto-detection; with neither, launching fails with install guidance.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let Some(executable) = detect::find_executable(options.browser_path.as_deref()) else {
            return Err(SessionError::Launch(format!(
                "no usable browser executable\n\n{}",
                detect::install_hint()
            )));
        };

        let mut builder = CdpBrowserConfig::builder();

        // chromiumoxide runs headless unless told otherwise.
        if !options.headless {
            builder = builder.with_head();
        }

        builder = builder
            .chrome_executable(&executable)
            .request_timeout(Duration::from_millis(options.navigation_timeout_ms));

        if let Some(ref ua) = options.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        for arg in &options.chrome_args {
            builder = builder.arg(arg);
        }
        builder = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox");

        let config = builder
            .build()
            .map_err(|e| SessionError::Launch(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(format!("{e}\n\n{}", detect::install_hint())))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(?event, "browser event");
            }
            debug!("browser event handler exited");
        });

        info!(
            executable = %executable.display(),
            headless = options.headless,
            "launched shared browser"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            wait_timeout: Duration::from_millis(options.wait_timeout_ms),
        })
    }

    /// Timeout applied to selector waits driven by sessions.
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Create an isolated browsing context.
    pub async fn create_context(&self) -> Result<BrowserContextId> {
        let browser = self.browser.lock().await;
        let resp = browser
            .execute(CreateBrowserContextParams::default())
            .await?;
        Ok(resp.result.browser_context_id)
    }

    /// Open a fresh page inside the given browsing context.
    pub async fn open_page(&self, ctx: &BrowserContextId) -> Result<Page> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(ctx.clone())
            .build()
            .map_err(SessionError::Cdp)?;
        let browser = self.browser.lock().await;
        Ok(browser.new_page(params).await?)
    }

    /// Dispose a browsing context. Pages inside it must be closed first.
    pub async fn dispose_context(&self, ctx: BrowserContextId) -> Result<()> {
        let params = DisposeBrowserContextParams::builder()
            .browser_context_id(ctx)
            .build()
            .map_err(SessionError::Cdp)?;
        let browser = self.browser.lock().await;
        browser.execute(params).await?;
        Ok(())
    }

    /// Close the browser process and stop the event handler task.
    pub async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "browser process wait failed");
        }
        self.handler_task.abort();
        info!("shared browser shut down");
    }
}
