//! Browser session lifecycle.
//!
//! [`Session`] owns at most one live page. Opening prefers the stealth launch
//! profile and falls back exactly once to a plain compatibility profile;
//! closing is idempotent and also runs on drop.

use anyhow::Result;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::page::{ChromePage, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Anti-automation launch flags plus CDP stealth patches.
    Stealth,
    /// Minimal flags, sandbox disabled. Starts where stealth does not.
    Plain,
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LaunchMode::Stealth => "stealth",
            LaunchMode::Plain => "plain",
        })
    }
}

/// Produces pages; the seam between the session manager and a real browser.
pub trait Launcher {
    type Page: Page;

    fn launch(&self, mode: LaunchMode) -> Result<Self::Page>;

    /// Release a page. The default drops it, which tears the browser down.
    fn shutdown(&self, page: Self::Page) {
        drop(page);
    }
}

/// How Chrome is started.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub profile_dir: Option<PathBuf>,
    pub persist_profile: bool,
}

impl BrowserOptions {
    /// Explicit profile dir, else a persistent one under the platform data
    /// dir when requested, else a throwaway profile.
    fn user_data_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.profile_dir {
            return Some(dir.clone());
        }
        if !self.persist_profile {
            return None;
        }
        dirs::data_local_dir().map(|base| base.join("autoabsen").join("chrome-profile"))
    }
}

pub struct ChromeLauncher {
    options: BrowserOptions,
}

impl ChromeLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    fn launch_options(&self, mode: LaunchMode) -> Result<LaunchOptions<'static>> {
        let user_data_dir = self.options.user_data_dir();
        if let Some(dir) = &user_data_dir {
            std::fs::create_dir_all(dir)?;
        }

        let mut args: Vec<&'static OsStr> = vec![
            OsStr::new("--no-first-run"),
            OsStr::new("--no-default-browser-check"),
            OsStr::new("--window-size=1366,900"),
            OsStr::new("--password-store=basic"),
        ];
        if mode == LaunchMode::Stealth {
            args.extend([
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-infobars"),
            ]);
        } else {
            args.extend([
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
            ]);
        }

        Ok(LaunchOptions {
            headless: self.options.headless,
            sandbox: mode == LaunchMode::Stealth,
            path: self.options.chrome_path.clone().or_else(find_chrome),
            user_data_dir,
            args,
            idle_browser_timeout: Duration::from_secs(300),
            ..Default::default()
        })
    }
}

impl Launcher for ChromeLauncher {
    type Page = ChromePage;

    fn launch(&self, mode: LaunchMode) -> Result<ChromePage> {
        let options = self.launch_options(mode)?;
        debug!(%mode, headless = options.headless, "starting chrome");
        let browser = Browser::new(options)
            .map_err(|e| anyhow::anyhow!("browser launch failed ({mode}): {e}"))?;
        let tab = browser.new_tab()?;
        if mode == LaunchMode::Stealth {
            tab.enable_stealth_mode()?;
        }
        tab.navigate_to("about:blank")?;
        Ok(ChromePage::new(browser, tab))
    }
}

/// Well-known install locations; `None` lets headless_chrome search on its own.
fn find_chrome() -> Option<PathBuf> {
    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];
    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}

/// One engine's browser session: `CLOSED -> OPEN -> CLOSED`.
pub struct Session<L: Launcher> {
    launcher: L,
    live: Option<L::Page>,
    prefer_stealth: bool,
    mode: Option<LaunchMode>,
}

impl<L: Launcher> Session<L> {
    pub fn new(launcher: L, prefer_stealth: bool) -> Self {
        Self {
            launcher,
            live: None,
            prefer_stealth,
            mode: None,
        }
    }

    /// Start the browser. Already-open sessions are reused.
    pub fn open(&mut self) -> bool {
        if self.live.is_some() {
            return true;
        }
        let modes: &[LaunchMode] = if self.prefer_stealth {
            &[LaunchMode::Stealth, LaunchMode::Plain]
        } else {
            &[LaunchMode::Plain]
        };
        for &mode in modes {
            match self.launcher.launch(mode) {
                Ok(page) => {
                    info!(%mode, "browser session opened");
                    self.live = Some(page);
                    self.mode = Some(mode);
                    return true;
                }
                Err(e) => warn!(%mode, error = %e, "browser launch failed"),
            }
        }
        error!("browser session could not be started");
        false
    }

    /// Tear the browser down. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(page) = self.live.take() {
            self.launcher.shutdown(page);
            info!(mode = ?self.mode, "browser session closed");
            self.mode = None;
        }
    }

    pub fn is_open(&self) -> bool {
        self.live.is_some()
    }

    pub fn page(&self) -> Option<&L::Page> {
        self.live.as_ref()
    }

    pub fn mode(&self) -> Option<LaunchMode> {
        self.mode
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

impl<L: Launcher> Drop for Session<L> {
    fn drop(&mut self) {
        self.close();
    }
}
