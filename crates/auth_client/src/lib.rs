use std::sync::Arc;

use anyhow::Context;
use shared::{
    domain::{Role, SessionIdentity, LANDING_PATH},
    session::{SessionRepository, SessionState},
};
use tracing::info;

pub mod config;
pub mod endpoints;
pub mod form;
pub mod resolver;
pub mod transport;

use config::{normalize_base_url, Settings};
use form::{FormController, FormDeps};
use transport::Transport;

/// Navigation seam. The embedding shell (CLI, GUI, whatever hosts the
/// forms) decides what "going to a path" means.
pub trait Router: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Default router: records where navigation would have gone. Keeps flows
/// runnable in hosts that have no notion of pages.
pub struct MissingRouter;

impl Router for MissingRouter {
    fn navigate(&self, path: &str) {
        info!(path, "no router wired, navigation dropped");
    }
}

/// Entry point for the whole client workflow: hands out per-role form
/// controllers and owns the session lifecycle.
pub struct AuthClient {
    transport: Arc<Transport>,
    sessions: Arc<dyn SessionRepository>,
    router: Arc<dyn Router>,
    settings: Settings,
}

impl AuthClient {
    /// Starts with `MissingRouter`; hosts that render pages swap in their
    /// own via `with_router`.
    pub fn new(
        settings: Settings,
        sessions: Arc<dyn SessionRepository>,
    ) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(&settings.base_url)
            .context("refusing to start with an unusable base url")?;
        info!(base_url, "auth client ready");
        Ok(Self {
            transport: Arc::new(Transport::new(base_url)),
            sessions,
            router: Arc::new(MissingRouter),
            settings,
        })
    }

    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = router;
        self
    }

    fn form_deps(&self) -> FormDeps {
        FormDeps {
            transport: Arc::clone(&self.transport),
            sessions: Arc::clone(&self.sessions),
            router: Arc::clone(&self.router),
            login_timeout: self.settings.login_timeout(),
            register_timeout: self.settings.register_timeout(),
        }
    }

    pub fn sign_in_form(&self, role: Role) -> FormController {
        FormController::sign_in(role, self.form_deps())
    }

    pub fn registration_form(&self, role: Role) -> FormController {
        FormController::registration(role, self.form_deps())
    }

    /// The active session's normalized identity, or `None` when logged out.
    /// A corrupt session (already wiped by the store) routes the user to
    /// the landing page, once.
    pub async fn current_user(&self) -> anyhow::Result<Option<SessionIdentity>> {
        match self.sessions.load().await? {
            SessionState::Active(identity) => Ok(Some(identity)),
            SessionState::Absent => Ok(None),
            SessionState::Wiped => {
                self.router.navigate(LANDING_PATH);
                Ok(None)
            }
        }
    }

    /// Wipes the stored session and navigates to the landing page. The
    /// navigation happens exactly once, after the wipe.
    pub async fn logout(&self) -> anyhow::Result<()> {
        self.sessions.clear().await.context("failed to clear session")?;
        self.router.navigate(LANDING_PATH);
        info!("logged out");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
