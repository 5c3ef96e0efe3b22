//! Login and publish flows.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use pinsmith_browser::{Browser, CdpError, LaunchOptions, PageSession, StorageState};
use pinsmith_media::{MediaStager, StagedMedia};
use pinsmith_protocols::error::{
    LoginError, LoginStage, PublishError, PublishStage, SessionError,
};
use pinsmith_protocols::matcher::BoardMatcher;
use pinsmith_protocols::session::SessionStore;
use pinsmith_protocols::types::{Credentials, MatchDecision, PinRequest, SessionStatus};

use crate::board::BoardResolver;
use crate::selectors;

/// Poll interval while waiting for the post-login redirect.
const REDIRECT_POLL: Duration = Duration::from_secs(1);
/// Pause after opening the board dropdown, letting entries render.
const BOARD_MENU_SETTLE: Duration = Duration::from_millis(1000);
/// Pause after typing into the board filter.
const FILTER_SETTLE: Duration = Duration::from_millis(1500);

/// Engine settings, mapped from the application configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub home_url: String,
    pub login_url: String,
    pub composer_url: String,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub probe_timeout: Duration,
    pub settle: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_url: "https://www.pinterest.com/".to_string(),
            login_url: "https://www.pinterest.com/login/".to_string(),
            composer_url: "https://www.pinterest.com/pin-builder/".to_string(),
            chrome_path: None,
            headless: true,
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(2),
            settle: Duration::from_secs(3),
        }
    }
}

/// Drives the login and pin-creation flows.
///
/// Each invocation owns one exclusive browser for its whole duration and
/// is fully sequential inside: every step waits for its precondition
/// before proceeding. The browser is torn down on every path. Invocations
/// for different users may run concurrently, each with its own browser;
/// two calls for the *same* user are not mutually excluded and may race
/// on the session artifact (last writer wins).
pub struct PublishEngine {
    config: EngineConfig,
    store: Arc<dyn SessionStore>,
    resolver: BoardResolver,
    stager: MediaStager,
}

impl PublishEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        matcher: Arc<dyn BoardMatcher>,
        stager: MediaStager,
    ) -> Self {
        Self {
            config,
            store,
            resolver: BoardResolver::new(matcher),
            stager,
        }
    }

    /// Authenticate against the target site and persist the captured
    /// session artifact, overwriting any prior one.
    pub async fn login(&self, user_id: &str, credentials: &Credentials) -> Result<(), LoginError> {
        info!(user_id, "starting login flow");

        let browser = self
            .open_browser()
            .await
            .map_err(|e| LoginError::Browser(e.to_string()))?;
        let outcome = self.drive_login(&browser, credentials).await;
        Self::close_browser(browser).await;
        let state = outcome?;

        let blob = state.to_bytes().map_err(|e| SessionError::Corrupt {
            user_id: user_id.to_string(),
            reason: e.to_string(),
        })?;
        self.store.save(user_id, &blob).await?;

        info!(user_id, "login complete; session persisted");
        Ok(())
    }

    /// Publish one pin using the stored session.
    ///
    /// Fails with [`PublishError::SessionNotFound`] before any browser or
    /// network activity when no artifact exists.
    pub async fn publish(&self, user_id: &str, request: &PinRequest) -> Result<(), PublishError> {
        request.validate().map_err(PublishError::InvalidRequest)?;

        let blob = match self.store.load(user_id).await {
            Ok(blob) => blob,
            Err(SessionError::NotFound(_)) => {
                return Err(PublishError::SessionNotFound(user_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let state = StorageState::from_bytes(&blob).map_err(|e| {
            PublishError::Session(SessionError::Corrupt {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })
        })?;

        info!(user_id, title = %request.title, board = %request.board, "starting publish flow");
        if let Some(at) = request.scheduled_time {
            debug!(scheduled_time = %at, "pin carries a scheduling timestamp");
        }

        let browser = self
            .open_browser()
            .await
            .map_err(|e| PublishError::Browser(e.to_string()))?;
        let outcome = self.drive_publish(&browser, state, request).await;
        Self::close_browser(browser).await;
        outcome
    }

    /// Whether a session artifact exists, and when it was written.
    pub async fn session_status(&self, user_id: &str) -> Result<SessionStatus, SessionError> {
        self.store.status(user_id).await
    }

    async fn drive_login(
        &self,
        browser: &Browser,
        credentials: &Credentials,
    ) -> Result<StorageState, LoginError> {
        use LoginStage::*;

        let page = browser
            .client()
            .new_page(None)
            .await
            .map_err(|e| login_err(OpeningBrowser, e))?;
        page.navigate(&self.config.login_url, self.config.navigation_timeout)
            .await
            .map_err(|e| login_err(AwaitingCredentialsForm, e))?;

        page.wait_for_selector(selectors::LOGIN_EMAIL, Some(self.config.selector_timeout))
            .await
            .map_err(|e| login_err(AwaitingCredentialsForm, e))?;
        page.fill(selectors::LOGIN_EMAIL, &credentials.email)
            .await
            .map_err(|e| login_err(AwaitingCredentialsForm, e))?;

        page.wait_for_selector(selectors::LOGIN_PASSWORD, Some(self.config.selector_timeout))
            .await
            .map_err(|e| login_err(AwaitingCredentialsForm, e))?;
        page.fill(selectors::LOGIN_PASSWORD, &credentials.password)
            .await
            .map_err(|e| login_err(AwaitingCredentialsForm, e))?;

        page.click_selector(selectors::LOGIN_SUBMIT)
            .await
            .map_err(|e| login_err(Submitting, e))?;

        // Unbounded by design: manual 2FA or challenge screens may sit
        // between the submit and the home redirect. Callers needing a hard
        // bound wrap this call in their own timeout.
        info!("awaiting post-login redirect");
        loop {
            sleep(REDIRECT_POLL).await;

            let url = page
                .current_url()
                .await
                .map_err(|e| login_err(AwaitingRedirectHome, e))?;
            if is_home_url(&self.config.home_url, &url) {
                break;
            }

            for &selector in selectors::LOGIN_ERROR_ALTERNATIVES {
                if page.query_selector(selector).await.ok().flatten().is_some() {
                    return Err(LoginError::CredentialsRejected);
                }
            }
            debug!(url, "still awaiting home redirect");
        }

        sleep(self.config.settle).await;

        let cookies = browser
            .client()
            .get_cookies()
            .await
            .map_err(|e| login_err(PersistingSession, e))?;
        Ok(StorageState { cookies })
    }

    async fn drive_publish(
        &self,
        browser: &Browser,
        state: StorageState,
        request: &PinRequest,
    ) -> Result<(), PublishError> {
        use PublishStage::*;

        if state.is_empty() {
            warn!("restored session carries no cookies");
        }
        browser
            .client()
            .set_cookies(&state.cookies)
            .await
            .map_err(|e| publish_err(RestoringSession, e))?;
        let page = browser
            .client()
            .new_page(None)
            .await
            .map_err(|e| publish_err(RestoringSession, e))?;

        // The composer must never be touched with a dead session: navigate
        // home and check whether the site bounced us to login.
        page.navigate(&self.config.home_url, self.config.navigation_timeout)
            .await
            .map_err(|e| publish_err(VerifyingSession, e))?;
        sleep(self.config.settle).await;
        let url = page
            .current_url()
            .await
            .map_err(|e| publish_err(VerifyingSession, e))?;
        debug!(url, "address after session restore");
        if url.contains("/login") || url.contains("/signup") {
            return Err(PublishError::SessionExpired);
        }

        page.navigate(&self.config.composer_url, self.config.navigation_timeout)
            .await
            .map_err(|e| publish_err(OpeningComposer, e))?;
        for selector in [
            selectors::TITLE_FIELD,
            selectors::DESCRIPTION_FIELD,
            selectors::FILE_INPUT,
        ] {
            page.wait_for_selector(selector, Some(self.config.selector_timeout))
                .await
                .map_err(|e| publish_err(OpeningComposer, e))?;
        }
        info!("composer ready");

        // Held until the end of the flow so temp files are removed on
        // every path.
        let staged = self.stage_media(&page, request).await;

        page.fill(selectors::TITLE_FIELD, &request.title)
            .await
            .map_err(|e| publish_err(FillingFields, e))?;
        if let Some(description) = &request.description {
            page.fill(selectors::DESCRIPTION_FIELD, description)
                .await
                .map_err(|e| publish_err(FillingFields, e))?;
        }
        debug!("title and description filled");

        self.click_with_fallbacks(
            &page,
            selectors::BOARD_DROPDOWN_ALTERNATIVES,
            selectors::BOARD_DROPDOWN_DEFAULT,
            ResolvingBoard,
        )
        .await?;
        sleep(BOARD_MENU_SETTLE).await;

        let candidates = self.scrape_boards(&page).await?;
        info!(count = candidates.len(), "scraped existing boards");

        let decision = self.resolver.resolve(&request.board, &candidates).await;
        match &decision {
            MatchDecision::Create(name) => self.create_board(&page, name).await?,
            MatchDecision::Reuse(name) => self.select_board(&page, name).await?,
        }

        self.click_with_fallbacks(
            &page,
            selectors::SAVE_ALTERNATIVES,
            selectors::SAVE_DEFAULT,
            Submitting,
        )
        .await?;
        sleep(self.config.settle).await;

        drop(staged);
        info!(board = decision.board_name(), "pin submitted");
        Ok(())
    }

    /// Stage the pin image and hand it to the file input.
    ///
    /// Best-effort per contract: any failure is logged and the pin is
    /// published without an image.
    async fn stage_media(&self, page: &PageSession, request: &PinRequest) -> Option<StagedMedia> {
        let staged = match self.stager.stage(request.image_ref.as_deref()).await {
            Ok(staged) => staged?,
            Err(e) => {
                warn!(error = %e, "media staging failed; publishing without image");
                return None;
            }
        };

        let path = staged.path().to_string_lossy().to_string();
        match page.set_file_input(selectors::FILE_INPUT, &path).await {
            Ok(()) => {
                sleep(self.config.settle).await;
                debug!(path, "image attached");
            }
            Err(e) => warn!(error = %e, "image upload failed; publishing without image"),
        }
        Some(staged)
    }

    /// Board names currently visible in the open dropdown. Re-scraped on
    /// every publish call; a cached list could cause a duplicate create.
    async fn scrape_boards(&self, page: &PageSession) -> Result<Vec<String>, PublishError> {
        let value = page
            .evaluate(selectors::BOARD_TITLES_JS)
            .await
            .map_err(|e| PublishError::BoardResolution(format!("failed to scrape boards: {e}")))?;
        serde_json::from_value(value).map_err(|e| {
            PublishError::BoardResolution(format!("unexpected board list payload: {e}"))
        })
    }

    async fn create_board(&self, page: &PageSession, name: &str) -> Result<(), PublishError> {
        use PublishStage::CreatingBoard;

        info!(board = name, "creating board");
        page.click_selector(selectors::CREATE_BOARD_ITEM)
            .await
            .map_err(|e| publish_err(CreatingBoard, e))?;

        match self
            .first_present(page, selectors::BOARD_NAME_ALTERNATIVES)
            .await
        {
            Some(selector) => {
                page.fill(selector, name)
                    .await
                    .map_err(|e| publish_err(CreatingBoard, e))?;
            }
            None => {
                // Some variants render the name input already focused
                warn!("board name input not found; typing into focused element");
                page.type_text(name)
                    .await
                    .map_err(|e| publish_err(CreatingBoard, e))?;
            }
        }

        page.click_selector(selectors::BOARD_FORM_SUBMIT)
            .await
            .map_err(|e| publish_err(CreatingBoard, e))?;
        sleep(self.config.settle).await;
        Ok(())
    }

    async fn select_board(&self, page: &PageSession, name: &str) -> Result<(), PublishError> {
        use PublishStage::SelectingBoard;

        info!(board = name, "selecting existing board");
        // Narrow the dropdown with its filter, then click the entry by title
        page.type_text(name)
            .await
            .map_err(|e| publish_err(SelectingBoard, e))?;
        sleep(FILTER_SETTLE).await;

        if let Err(e) = page.click_selector(&selectors::board_item(name)).await {
            debug!(error = %e, "board entry not clickable by title; accepting first filtered result");
            page.press_key("Enter")
                .await
                .map_err(|e| publish_err(SelectingBoard, e))?;
        }
        Ok(())
    }

    /// Try each alternative locator with a short probe, clicking the first
    /// that matches; fall back to the default locator with a bounded wait.
    /// Expiry there is fatal rather than hanging on a layout that no
    /// longer exists.
    async fn click_with_fallbacks(
        &self,
        page: &PageSession,
        alternatives: &[&str],
        default: &str,
        stage: PublishStage,
    ) -> Result<(), PublishError> {
        for &selector in alternatives {
            match page
                .wait_for_selector(selector, Some(self.config.probe_timeout))
                .await
            {
                Ok(_) => match page.click_selector(selector).await {
                    Ok(()) => {
                        debug!(selector, stage = %stage, "matched alternative locator");
                        return Ok(());
                    }
                    Err(e) => {
                        debug!(selector, error = %e, "alternative locator failed; trying next")
                    }
                },
                Err(CdpError::Timeout(_)) => {}
                Err(e) => debug!(selector, error = %e, "locator probe failed; trying next"),
            }
        }

        warn!(default, stage = %stage, "no alternative locator matched; falling back");
        page.wait_for_selector(default, Some(self.config.selector_timeout))
            .await
            .map_err(|e| publish_err(stage, e))?;
        page.click_selector(default)
            .await
            .map_err(|e| publish_err(stage, e))
    }

    /// First alternative locator present within the probe timeout.
    async fn first_present<'a>(
        &self,
        page: &PageSession,
        alternatives: &[&'a str],
    ) -> Option<&'a str> {
        for &selector in alternatives {
            if page
                .wait_for_selector(selector, Some(self.config.probe_timeout))
                .await
                .is_ok()
            {
                return Some(selector);
            }
        }
        None
    }

    async fn open_browser(&self) -> Result<Browser, CdpError> {
        Browser::launch(&LaunchOptions {
            chrome_path: self.config.chrome_path.clone(),
            headless: self.config.headless,
        })
        .await
    }

    async fn close_browser(browser: Browser) {
        if let Err(e) = browser.shutdown().await {
            warn!(error = %e, "browser shutdown failed");
        }
    }
}

fn login_err(stage: LoginStage, e: CdpError) -> LoginError {
    match e {
        CdpError::Timeout(message) => LoginError::Timeout { stage, message },
        other => LoginError::FormInteraction {
            stage,
            message: other.to_string(),
        },
    }
}

fn publish_err(stage: PublishStage, e: CdpError) -> PublishError {
    match e {
        CdpError::Timeout(message) => PublishError::Timeout { stage, message },
        CdpError::NavigationFailed(message) | CdpError::EndpointUnavailable(message) => {
            PublishError::Navigation { stage, message }
        }
        other => PublishError::FormInteraction {
            stage,
            message: other.to_string(),
        },
    }
}

/// Whether an address is the site's home page (same host, root path).
/// A login or challenge page shares the host but never the root path.
fn is_home_url(home: &str, current: &str) -> bool {
    let (Ok(home), Ok(current)) = (Url::parse(home), Url::parse(current)) else {
        return false;
    };
    home.host_str() == current.host_str() && matches!(current.path(), "" | "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use pinsmith_protocols::matcher::NoSemanticMatch;
    use pinsmith_session::FileSessionStore;

    /// Engine over a temp store, with a chrome path that cannot exist so
    /// any accidental browser launch fails loudly as `Browser`.
    fn engine(dir: &TempDir) -> PublishEngine {
        let config = EngineConfig {
            chrome_path: Some(PathBuf::from("/nonexistent/chrome-for-tests")),
            ..Default::default()
        };
        PublishEngine::new(
            config,
            Arc::new(FileSessionStore::new(dir.path())),
            Arc::new(NoSemanticMatch),
            MediaStager::new(1000),
        )
    }

    fn request() -> PinRequest {
        PinRequest {
            title: "Cozy Reading Nook".to_string(),
            description: Some("Warm corner ideas".to_string()),
            image_ref: None,
            board: "Home Decor".to_string(),
            scheduled_time: Some(chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_publish_without_login_fails_before_browser() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        let err = engine.publish("user-1", &request()).await.unwrap_err();
        assert!(
            matches!(err, PublishError::SessionNotFound(ref id) if id == "user-1"),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_publish_rejects_invalid_request() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        let mut bad = request();
        bad.title = "  ".to_string();
        let err = engine.publish("user-1", &bad).await.unwrap_err();
        assert!(matches!(err, PublishError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_publish_rejects_traversal_user_id() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        let err = engine.publish("../evil", &request()).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::Session(SessionError::InvalidUserId(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_corrupt_artifact_fails_before_browser() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        let store = FileSessionStore::new(dir.path());
        pinsmith_protocols::session::SessionStore::save(&store, "user-1", b"not json")
            .await
            .unwrap();

        let err = engine.publish("user-1", &request()).await.unwrap_err();
        assert!(
            matches!(err, PublishError::Session(SessionError::Corrupt { .. })),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_session_status() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        let status = engine.session_status("user-1").await.unwrap();
        assert!(!status.active);

        let store = FileSessionStore::new(dir.path());
        pinsmith_protocols::session::SessionStore::save(&store, "user-1", b"{\"cookies\":[]}")
            .await
            .unwrap();

        let status = engine.session_status("user-1").await.unwrap();
        assert!(status.active);
        assert!(status.last_modified.is_some());
    }

    #[test]
    fn test_is_home_url() {
        let home = "https://www.pinterest.com/";
        assert!(is_home_url(home, "https://www.pinterest.com/"));
        assert!(is_home_url(home, "https://www.pinterest.com"));
        assert!(!is_home_url(home, "https://www.pinterest.com/login/"));
        assert!(!is_home_url(home, "https://www.pinterest.com/signup/"));
        assert!(!is_home_url(home, "https://accounts.example.com/"));
        assert!(!is_home_url(home, "not a url"));
    }
}
