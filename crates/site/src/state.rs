//! Application state shared across handlers.

use std::sync::Arc;

use hmac::digest::InvalidLength;
use sqlx::PgPool;

use crate::cache::PageCache;
use crate::config::SiteConfig;
use crate::db::{AdminDirectory, BookingStore, PgAdminDirectory, PgBookingStore};
use crate::middleware::identity::IdentitySigner;
use crate::services::auth::{AuthError, GoTrueClient, RefreshCoordinator, SessionStore};
use crate::services::notify::{LiveNotifier, Notifier, NotifyError};
use crate::services::storage::{StorageClient, StorageError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("auth client: {0}")]
    Auth(#[from] AuthError),
    #[error("notifier: {0}")]
    Notify(#[from] NotifyError),
    #[error("storage client: {0}")]
    Storage(#[from] StorageError),
    #[error("identity signer: {0}")]
    Signer(#[from] InvalidLength),
}

/// The swappable external backends.
///
/// Production uses the hosted auth service, `PostgreSQL` and SMTP/WhatsApp;
/// tests substitute in-memory implementations.
#[derive(Clone)]
pub struct Backends {
    pub sessions: Arc<dyn SessionStore>,
    pub admins: Arc<dyn AdminDirectory>,
    pub bookings: Arc<dyn BookingStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    pool: PgPool,
    backends: Backends,
    storage: StorageClient,
    pages: PageCache,
    refresher: RefreshCoordinator,
    signer: IdentitySigner,
}

impl AppState {
    /// Create the production state.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the service clients cannot be built.
    pub fn new(config: SiteConfig, pool: PgPool) -> Result<Self, StateError> {
        let backends = Backends {
            sessions: Arc::new(GoTrueClient::new(&config.supabase)?),
            admins: Arc::new(PgAdminDirectory::new(pool.clone())),
            bookings: Arc::new(PgBookingStore::new(pool.clone())),
            notifier: Arc::new(LiveNotifier::new(
                config.email.as_ref(),
                config.whatsapp.as_ref(),
                &config.site_url,
            )?),
        };

        Self::with_backends(config, pool, backends)
    }

    /// Create a state around the given backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage client or identity signer cannot be built.
    pub fn with_backends(
        config: SiteConfig,
        pool: PgPool,
        backends: Backends,
    ) -> Result<Self, StateError> {
        let storage = StorageClient::new(&config.supabase)?;
        let pages = PageCache::new(config.page_cache_ttl);
        let signer = IdentitySigner::new(&config.session_secret)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backends,
                storage,
                pages,
                refresher: RefreshCoordinator::default(),
                signer,
            }),
        })
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The hosted auth service.
    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.inner.backends.sessions.as_ref()
    }

    /// Admin records and invitations.
    #[must_use]
    pub fn admins(&self) -> &dyn AdminDirectory {
        self.inner.backends.admins.as_ref()
    }

    /// Where contact submissions go.
    #[must_use]
    pub fn bookings(&self) -> Arc<dyn BookingStore> {
        Arc::clone(&self.inner.backends.bookings)
    }

    /// Outbound notifications.
    #[must_use]
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.inner.backends.notifier)
    }

    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Rendered page cache.
    #[must_use]
    pub fn pages(&self) -> &PageCache {
        &self.inner.pages
    }

    /// The only path to refresh-token redemption.
    #[must_use]
    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.inner.refresher
    }

    #[must_use]
    pub fn signer(&self) -> &IdentitySigner {
        &self.inner.signer
    }
}
