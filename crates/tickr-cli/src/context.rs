//! Per-invocation wiring
//!
//! Builds the pieces a todo command needs from configuration: the
//! connectivity signal, the current session and a sync controller.

use anyhow::{bail, Context, Result};
use tracing::debug;

use tickr_core::auth::AuthProvider;
use tickr_core::connectivity::check_reachable;
use tickr_core::{
    Config, Connectivity, FileCache, GoTrueAuth, Session, SessionStore, SupabaseStore,
    SyncController,
};

/// Controller type used by the CLI
///
/// The store is absent when the backend is not configured; such a run is
/// always offline.
pub type Controller = SyncController<Option<SupabaseStore>, FileCache>;

const NOT_CONFIGURED: &str =
    "Backend not configured. Set api_url and anon_key with `tickr config set`.";

pub struct AppContext {
    pub config: Config,
    pub connectivity: Connectivity,
    /// `--offline` was given; never check the network
    pub forced_offline: bool,
}

impl AppContext {
    /// Load the connectivity state for this run
    pub async fn connect(config: Config, forced_offline: bool) -> Self {
        let ctx = Self::offline(config, forced_offline);
        let online = ctx.check_online().await;
        ctx.connectivity.set_online(online);
        ctx
    }

    /// Context that starts offline without probing
    pub fn offline(config: Config, forced_offline: bool) -> Self {
        Self {
            config,
            connectivity: Connectivity::new(false),
            forced_offline,
        }
    }

    /// Check whether the backend is reachable right now
    pub async fn check_online(&self) -> bool {
        if self.forced_offline {
            return false;
        }
        if !self.config.is_backend_configured() {
            debug!("Backend not configured; treating as offline");
            return false;
        }
        match self.config.api_url.as_deref() {
            Some(url) => check_reachable(url, self.config.request_timeout()).await,
            None => false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// The signed-in session
    ///
    /// Offline, an expired session is still accepted: it only identifies
    /// whose snapshot to read.
    pub async fn session(&self) -> Result<Session> {
        let session = if self.is_online() {
            auth(&self.config)?.get_session().await?
        } else {
            SessionStore::new(self.config.session_path()).load()?
        };

        match session {
            Some(s) => Ok(s),
            None => bail!("Not logged in. Run `tickr login <email>` first."),
        }
    }

    /// Controller for the signed-in user, not yet fetched
    ///
    /// The backend is only required when this run can go online.
    pub fn controller(&self, session: &Session) -> Result<Controller> {
        let store = if self.config.is_backend_configured() {
            Some(
                SupabaseStore::from_config(&self.config)
                    .context(NOT_CONFIGURED)?
                    .with_access_token(&session.access_token),
            )
        } else if self.is_online() {
            bail!(NOT_CONFIGURED);
        } else {
            debug!("No backend configured; working from the offline snapshot");
            None
        };

        Ok(SyncController::new(
            store,
            FileCache::from_config(&self.config),
            &session.user.id,
            self.connectivity.subscribe(),
        ))
    }

    /// Session plus a controller that has already loaded the list
    pub async fn open(&self) -> Result<Controller> {
        let session = self.session().await?;
        let mut controller = self.controller(&session)?;
        controller.fetch().await;
        Ok(controller)
    }
}

/// Auth client for the configured backend
pub fn auth(config: &Config) -> Result<GoTrueAuth> {
    GoTrueAuth::from_config(config).context(NOT_CONFIGURED)
}
