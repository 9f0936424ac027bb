//! # Sessions
//!
//! Server-side sessions identified by a random cookie. The data never leaves the
//! process; the browser only holds the id.
//!
//! ## Lifecycle
//! 1. [`session_layer`] runs for every request, loads the session named by the cookie
//!    or creates a fresh one, and sets the cookie when the session is new
//! 2. Handlers receive the [`Session`] handle through an `Extension`
//! 3. [`SessionStore::spawn_sweeper`] evicts sessions idle for longer than the timeout

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::common::config::SessionConfig;

/// Everything stored for one visitor.
#[derive(Debug, Clone)]
struct SessionData {
    logged_in: bool,
    user_id: Option<i64>,
    csrf: HashMap<String, String>,
    last_seen: Instant,
}

impl SessionData {
    fn new() -> Self {
        Self {
            logged_in: false,
            user_id: None,
            csrf: HashMap::new(),
            last_seen: Instant::now(),
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    cookie_name: String,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            cookie_name: config.cookie_name.clone(),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Resume the session with id `existing` or start a new one.
    ///
    /// # Returns
    /// The session handle and whether it was just created.
    pub async fn load_or_create(&self, existing: Option<&str>) -> (Session, bool) {
        let mut sessions = self.sessions.write().await;

        if let Some(id) = existing {
            if let Some(data) = sessions.get_mut(id) {
                data.last_seen = Instant::now();
                return (self.handle(id.to_string()), false);
            }
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        sessions.insert(id.clone(), SessionData::new());
        debug!("New session {}", id);
        (self.handle(id), true)
    }

    fn handle(&self, id: String) -> Session {
        Session {
            id,
            store: self.clone(),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions whose last request is older than the idle timeout at `now`.
    ///
    /// # Returns
    /// Number of evicted sessions.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let timeout = self.idle_timeout;
        sessions.retain(|_, data| now.saturating_duration_since(data.last_seen) <= timeout);
        before - sessions.len()
    }

    /// Start the background task that evicts idle sessions.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.sweep_interval);
            loop {
                ticker.tick().await;
                let evicted = store.sweep_at(Instant::now()).await;
                if evicted > 0 {
                    info!("🧹 Evicted {} idle sessions", evicted);
                }
            }
        })
    }

    async fn update<R>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(f)
    }

    async fn read<R>(&self, id: &str, f: impl FnOnce(&SessionData) -> R) -> Option<R> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(f)
    }
}

/// Handle to the current request's session.
#[derive(Clone)]
pub struct Session {
    id: String,
    store: SessionStore,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn login(&self, user_id: i64) {
        self.store
            .update(&self.id, |data| {
                data.logged_in = true;
                data.user_id = Some(user_id);
            })
            .await;
    }

    pub async fn logout(&self) {
        self.store
            .update(&self.id, |data| {
                data.logged_in = false;
                data.user_id = None;
            })
            .await;
    }

    /// The logged-in user id. Both the flag and the id must be set.
    pub async fn logged_in_user(&self) -> Option<i64> {
        self.store
            .read(&self.id, |data| data.user_id.filter(|_| data.logged_in))
            .await
            .flatten()
    }

    /// The user id stored in the session, logged in or not.
    pub async fn user_id(&self) -> Option<i64> {
        self.store.read(&self.id, |data| data.user_id).await.flatten()
    }

    /// Store `token` under `scope`, replacing the previous one.
    pub async fn set_csrf(&self, scope: &str, token: String) {
        self.store
            .update(&self.id, |data| {
                data.csrf.insert(scope.to_string(), token);
            })
            .await;
    }

    pub async fn csrf(&self, scope: &str) -> Option<String> {
        self.store
            .read(&self.id, |data| data.csrf.get(scope).cloned())
            .await
            .flatten()
    }
}

/// Value of cookie `name` in the request headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Middleware attaching a [`Session`] to every request.
pub async fn session_layer(
    State(store): State<SessionStore>,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = cookie_value(req.headers(), store.cookie_name()).map(str::to_string);
    let (session, created) = store.load_or_create(existing.as_deref()).await;
    let id = session.id().to_string();
    req.extensions_mut().insert(session);

    let mut response = next.run(req).await;

    if created {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            store.cookie_name(),
            id
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}
