use crate::scrapers::browser::ChromePage;
use crate::scrapers::traits::SessionProvider;
use crate::scrapers::types::SiteConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Target::DisposeBrowserContext;
use headless_chrome::{Browser, LaunchOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Run a synchronous CDP call off the async runtime
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Browser task panicked")?
}

/// How the shared Chrome process is started
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub idle_timeout: Duration,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            idle_timeout: Duration::from_secs(3600),
        }
    }
}

/// CDP steps that tear a browsing context down
trait Teardown {
    fn close_tab(&self) -> Result<()>;
    fn dispose(&self) -> Result<()>;
}

/// Close the request tab first, then dispose its context even if the tab would not close
fn teardown(target: &impl Teardown) -> Result<()> {
    if let Err(e) = target.close_tab() {
        debug!("Tab close failed, disposing context anyway: {:#}", e);
    }
    target.dispose()
}

/// Isolated cookie/storage scope with a single tab, owned by one request
pub struct BrowsingContext {
    shared: Shared,
    context_id: String,
    tab: Arc<Tab>,
}

impl BrowsingContext {
    pub fn tab(&self) -> Arc<Tab> {
        self.tab.clone()
    }

    pub fn id(&self) -> &str {
        &self.context_id
    }

    async fn close(self) -> Result<()> {
        blocking(move || teardown(&self)).await
    }
}

impl Teardown for BrowsingContext {
    fn close_tab(&self) -> Result<()> {
        self.tab.close(false).context("Failed to close tab")?;
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        self.shared
            .control
            .call_method(DisposeBrowserContext {
                browser_context_id: self.context_id.clone(),
            })
            .context("Failed to dispose browser context")?;
        Ok(())
    }
}

/// The Chrome process plus a tab in its default context that carries
/// browser-level commands
#[derive(Clone)]
struct Shared {
    browser: Arc<Browser>,
    control: Arc<Tab>,
}

/// One lazily started Chrome process shared by every request
pub struct BrowserSessions {
    launch: LaunchSettings,
    site: Arc<SiteConfig>,
    browser: Mutex<Option<Shared>>,
}

impl BrowserSessions {
    pub fn new(launch: LaunchSettings, site: Arc<SiteConfig>) -> Self {
        Self {
            launch,
            site,
            browser: Mutex::new(None),
        }
    }

    /// Shared browser handle, launching Chrome on first use.
    /// The lock is held across the launch so concurrent callers start it at most once.
    async fn browser(&self) -> Result<Shared> {
        let mut slot = self.browser.lock().await;
        if let Some(shared) = slot.as_ref() {
            return Ok(shared.clone());
        }

        info!("Launching headless Chrome...");
        let launch = self.launch.clone();
        let shared = blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(launch.headless)
                .sandbox(false)
                .path(launch.chrome_path)
                .idle_browser_timeout(launch.idle_timeout)
                .build()
                .context("Failed to build launch options")?;
            let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
            let control = browser.new_tab().context("Failed to open control tab")?;
            Ok(Shared {
                browser: Arc::new(browser),
                control,
            })
        })
        .await?;

        *slot = Some(shared.clone());
        Ok(shared)
    }

    /// Close the shared process. Safe to call when nothing is running.
    pub async fn shutdown(&self) {
        if let Some(shared) = self.browser.lock().await.take() {
            info!("Shutting down Chrome");
            drop(shared);
        }
    }
}

#[async_trait]
impl SessionProvider for BrowserSessions {
    type Page = ChromePage;

    async fn acquire(&self) -> Result<ChromePage> {
        let shared = self.browser().await?;

        let browser = shared.browser.clone();
        let (context_id, tab) = blocking(move || {
            let context = browser
                .new_context()
                .context("Failed to create browser context")?;
            let tab = context.new_tab().context("Failed to open tab")?;
            Ok((context.get_id().to_string(), tab))
        })
        .await?;

        tab.set_default_timeout(self.site.navigation_timeout);
        debug!(context = %context_id, "Browsing context acquired");

        Ok(ChromePage::new(
            BrowsingContext {
                shared,
                context_id,
                tab,
            },
            self.site.clone(),
        ))
    }

    async fn release(&self, page: ChromePage) {
        let context = page.into_context();
        let id = context.id().to_string();
        match context.close().await {
            Ok(()) => debug!(context = %id, "Browsing context released"),
            Err(e) => warn!(context = %id, "Failed to release browsing context: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_without_a_process_is_a_no_op() {
        let sessions = BrowserSessions::new(LaunchSettings::default(), Arc::new(SiteConfig::default()));
        sessions.shutdown().await;
        sessions.shutdown().await;
        assert!(sessions.browser.lock().await.is_none());
    }

    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordedTeardown {
        tab_fails: bool,
        dispose_fails: bool,
        steps: StdMutex<Vec<&'static str>>,
    }

    impl Teardown for RecordedTeardown {
        fn close_tab(&self) -> Result<()> {
            self.steps.lock().unwrap().push("close_tab");
            if self.tab_fails {
                anyhow::bail!("tab already gone");
            }
            Ok(())
        }

        fn dispose(&self) -> Result<()> {
            self.steps.lock().unwrap().push("dispose");
            if self.dispose_fails {
                anyhow::bail!("No browser context with given id found");
            }
            Ok(())
        }
    }

    #[test]
    fn teardown_closes_the_tab_then_disposes() {
        let target = RecordedTeardown::default();
        teardown(&target).unwrap();
        assert_eq!(*target.steps.lock().unwrap(), vec!["close_tab", "dispose"]);
    }

    #[test]
    fn context_is_disposed_even_when_the_tab_will_not_close() {
        let target = RecordedTeardown {
            tab_fails: true,
            ..Default::default()
        };
        teardown(&target).unwrap();
        assert_eq!(*target.steps.lock().unwrap(), vec!["close_tab", "dispose"]);
    }

    #[test]
    fn dispose_failure_is_reported() {
        let target = RecordedTeardown {
            dispose_fails: true,
            ..Default::default()
        };
        let err = teardown(&target).unwrap_err();
        assert!(err.to_string().contains("No browser context"));
    }

    #[tokio::test]
    async fn blocking_propagates_errors() {
        let result: Result<()> = blocking(|| anyhow::bail!("cdp went away")).await;
        assert_eq!(result.unwrap_err().to_string(), "cdp went away");
    }
}
