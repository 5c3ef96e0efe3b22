//! Chrome launcher with ephemeral per-invocation profiles.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::client::CdpClient;
use crate::error::CdpError;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launch settings for a browser instance.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Explicit executable. Well-known platform paths are probed when unset.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
}

/// A running Chrome owned by one login or publish invocation.
///
/// Each instance gets a throwaway profile directory and an ephemeral
/// debugging port, so concurrent invocations for different users cannot
/// collide. [`Browser::shutdown`] kills the process and removes the
/// profile; the child is additionally killed on drop as a backstop.
pub struct Browser {
    client: CdpClient,
    child: Child,
    /// Deleted on drop, taking cookies and caches with it.
    _profile: TempDir,
}

impl Browser {
    /// Launch Chrome and connect to it.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, CdpError> {
        let chrome_path = match &options.chrome_path {
            Some(path) => path.clone(),
            None => find_chrome().ok_or(CdpError::ChromeNotFound)?,
        };

        let profile = tempfile::Builder::new()
            .prefix("pinsmith-profile-")
            .tempdir()
            .map_err(|e| CdpError::LaunchFailed(e.to_string()))?;

        info!(chrome = %chrome_path.display(), profile = %profile.path().display(), "launching chrome");

        let mut cmd = Command::new(&chrome_path);
        cmd.arg("--remote-debugging-port=0")
            .arg(format!("--user-data-dir={}", profile.path().display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .arg("about:blank")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if options.headless {
            cmd.arg("--headless=new");
        }

        let child = cmd.spawn().map_err(|e| CdpError::LaunchFailed(e.to_string()))?;
        debug!(pid = ?child.id(), "chrome spawned");

        let port = wait_for_devtools_port(profile.path()).await?;
        let endpoint = format!("http://127.0.0.1:{port}");
        let client = CdpClient::connect(&endpoint).await?;

        Ok(Self {
            client,
            child,
            _profile: profile,
        })
    }

    pub fn client(&self) -> &CdpClient {
        &self.client
    }

    /// Kill the browser and discard its profile.
    pub async fn shutdown(mut self) -> Result<(), CdpError> {
        if let Err(e) = self.child.kill().await {
            warn!("failed to kill chrome: {e}");
        }
        debug!("browser shut down");
        Ok(())
    }
}

/// Resolve the ephemeral debugging port Chrome wrote into its profile.
///
/// With `--remote-debugging-port=0` Chrome picks a free port and records
/// it in `<profile>/DevToolsActivePort`, first line.
async fn wait_for_devtools_port(profile: &std::path::Path) -> Result<u16, CdpError> {
    let marker = profile.join("DevToolsActivePort");
    let start = Instant::now();

    loop {
        if let Ok(content) = tokio::fs::read_to_string(&marker).await {
            if let Some(port) = content.lines().next().and_then(|l| l.trim().parse().ok()) {
                debug!(port, "resolved devtools port");
                return Ok(port);
            }
        }
        if start.elapsed() > STARTUP_TIMEOUT {
            return Err(CdpError::EndpointUnavailable(
                "chrome did not publish DevToolsActivePort".to_string(),
            ));
        }
        tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
    }
}

/// Probe well-known Chrome/Chromium locations.
fn find_chrome() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ];

    #[cfg(target_os = "linux")]
    let paths = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    #[cfg(target_os = "windows")]
    let paths = [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    paths.iter().map(PathBuf::from).find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_default() {
        let options = LaunchOptions::default();
        assert!(options.chrome_path.is_none());
        assert!(!options.headless);
    }

    #[tokio::test]
    async fn test_launch_with_missing_executable() {
        let options = LaunchOptions {
            chrome_path: Some(PathBuf::from("/nonexistent/chrome")),
            headless: true,
        };
        let result = Browser::launch(&options).await;
        assert!(matches!(result, Err(CdpError::LaunchFailed(_))));
    }

    #[tokio::test]
    async fn test_devtools_port_marker_parse() {
        let profile = TempDir::new().unwrap();
        tokio::fs::write(
            profile.path().join("DevToolsActivePort"),
            "39251\n/devtools/browser/abc",
        )
        .await
        .unwrap();
        let port = wait_for_devtools_port(profile.path()).await.unwrap();
        assert_eq!(port, 39251);
    }
}
