//! # Request Guards
//!
//! Each guard checks one precondition of a request and hands the next guard what it
//! learned. Handlers chain them with `?` in a fixed order:
//!
//! ```text
//! require_site_registered -> require_site_activated -> csrf -> require_logged_in -> require_permissions
//! ```
//!
//! Every guard takes a [`ResponseMode`]. JSON endpoints answer a failed check with
//! `{status: false, info}`; page endpoints abort with a status code or redirect to the
//! login page.

use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::warn;
use std::sync::Arc;

use super::reply::Rejection;
use super::session::Session;
use super::state::AppState;
use super::form::FormData;
use crate::store::{random_token, Site, User};

const NO_PERMISSION: &str = "No permission to access";
const INACTIVE_SITE: &str = "Inactive site";
const INACTIVE_USER: &str = "Inactive user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Json,
    Page,
}

impl ResponseMode {
    fn deny(self, status: StatusCode, info: impl Into<String>) -> Rejection {
        let info = info.into();
        warn!("🚫 {}", info);
        match self {
            ResponseMode::Json => Rejection::Json(info),
            ResponseMode::Page => Rejection::Abort(status, info),
        }
    }
}

/// What [`require_site_registered`] injects.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub site: Site,
    pub owner: User,
    /// `scheme://netloc` as requested
    pub host: String,
    /// Requested netloc without a leading `www.`
    pub netloc: String,
}

/// `(host, netloc)` of the request.
///
/// The scheme comes from `X-Forwarded-Proto` when a proxy sets it.
pub fn request_host(headers: &HeaderMap) -> (String, String) {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "http".to_string());
    let netloc = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string();

    let host = format!("{}://{}", scheme, netloc);
    let netloc = netloc
        .strip_prefix("www.")
        .map(str::to_string)
        .unwrap_or(netloc);
    (host, netloc)
}

/// Load the main site and its owner.
pub fn require_site_registered(
    state: &AppState,
    headers: &HeaderMap,
    mode: ResponseMode,
) -> Result<SiteContext, Rejection> {
    let (host, netloc) = request_host(headers);

    let site = state.db.main_site()?;
    let owner = match &site {
        Some(site) => state.db.user_by_id(site.user)?,
        None => None,
    };

    match (site, owner) {
        (Some(site), Some(owner)) => Ok(SiteContext {
            site,
            owner,
            host,
            netloc,
        }),
        _ => Err(mode.deny(
            StatusCode::NOT_FOUND,
            format!("Site {} does not exist on this server", host),
        )),
    }
}

pub fn require_site_activated(ctx: &SiteContext, mode: ResponseMode) -> Result<(), Rejection> {
    if ctx.site.active {
        Ok(())
    } else {
        Err(mode.deny(StatusCode::FORBIDDEN, INACTIVE_SITE))
    }
}

/// Middleware form of the first two guards, for the static file mounts.
pub async fn require_active_site(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let mode = ResponseMode::Page;
    match require_site_registered(&state, req.headers(), mode)
        .and_then(|ctx| require_site_activated(&ctx, mode))
    {
        Ok(()) => next.run(req).await,
        Err(rejection) => rejection.into_response(),
    }
}

// ============================================================================
// CSRF
// ============================================================================

/// Session keys of the CSRF tokens, one per form family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfScope {
    Index,
    Login,
    Site,
    User,
    Recovery,
    Portfolios,
    Pictures,
}

impl CsrfScope {
    pub fn key(self) -> &'static str {
        match self {
            CsrfScope::Index => "csrf_index",
            CsrfScope::Login => "csrf_login",
            CsrfScope::Site => "csrf_site",
            CsrfScope::User => "csrf_user",
            CsrfScope::Recovery => "csrf_recovery",
            CsrfScope::Portfolios => "csrf_portfolios",
            CsrfScope::Pictures => "csrf_pictures",
        }
    }
}

/// Issue a fresh token for a page that renders a form.
pub async fn issue_csrf(session: &Session, scope: CsrfScope) -> String {
    let token = random_token();
    session.set_csrf(scope.key(), token.clone()).await;
    token
}

/// Check the `csrf` field of a submitted form against the session.
pub async fn verify_csrf(
    session: &Session,
    scope: CsrfScope,
    form: &FormData,
    mode: ResponseMode,
) -> Result<String, Rejection> {
    let submitted = form.get("csrf").filter(|token| !token.is_empty());
    let expected = session.csrf(scope.key()).await;

    match (submitted, expected) {
        (Some(submitted), Some(expected)) if submitted == expected => Ok(expected),
        _ => Err(mode.deny(
            StatusCode::FORBIDDEN,
            "Invalid or expired data, reload the page.",
        )),
    }
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// What [`require_logged_in`] injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedIn {
    pub user_id: i64,
}

/// The session must belong to the owner of an active site, and the owner must be active.
///
/// Any mismatch logs the session out.
pub async fn require_logged_in(
    session: &Session,
    ctx: &SiteContext,
    uri: &Uri,
    mode: ResponseMode,
) -> Result<LoggedIn, Rejection> {
    let Some(user_id) = session.logged_in_user().await else {
        return Err(match mode {
            ResponseMode::Json => {
                warn!("🚫 Login required for {}", uri);
                Rejection::Json("Login required, reload the page.".to_string())
            }
            ResponseMode::Page => Rejection::Redirect(login_redirect(&ctx.host, uri)),
        });
    };

    let problem = if ctx.owner.id != user_id {
        Some(NO_PERMISSION)
    } else if !ctx.site.active {
        Some(INACTIVE_SITE)
    } else if !ctx.owner.active {
        Some(INACTIVE_USER)
    } else {
        None
    };

    match problem {
        Some(info) => {
            session.logout().await;
            Err(mode.deny(StatusCode::FORBIDDEN, info))
        }
        None => Ok(LoggedIn { user_id }),
    }
}

/// `/login/?redirect_url=...` pointing back at the requested URL.
pub fn login_redirect(host: &str, uri: &Uri) -> String {
    let target = format!(
        "{}{}",
        host,
        uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
    );
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("/login/?redirect_url={}", encoded)
}

// ============================================================================
// PERMISSIONS
// ============================================================================

/// Site and user ids a request claims to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionClaim {
    pub site_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl PermissionClaim {
    /// Ids from form fields, usually `site` and `user`.
    pub fn from_form(form: &FormData, site_key: &str, user_key: &str) -> Self {
        Self {
            site_id: form.id(site_key),
            user_id: form.id(user_key),
        }
    }

    /// Ids from path parameters.
    pub fn from_path(site_id: i64, user_id: i64) -> Self {
        Self {
            site_id: Some(site_id),
            user_id: Some(user_id),
        }
    }
}

/// The claimed ids must name the session user and the site it owns.
///
/// A claim for another user logs the session out.
pub async fn require_permissions(
    session: &Session,
    ctx: &SiteContext,
    claim: PermissionClaim,
    mode: ResponseMode,
) -> Result<(), Rejection> {
    let (Some(site_id), Some(user_id)) = (claim.site_id, claim.user_id) else {
        return Err(mode.deny(StatusCode::FORBIDDEN, NO_PERMISSION));
    };

    if session.user_id().await != Some(user_id) {
        session.logout().await;
        return Err(mode.deny(StatusCode::FORBIDDEN, NO_PERMISSION));
    }
    if site_id == 0 || user_id == 0 {
        return Err(mode.deny(StatusCode::FORBIDDEN, NO_PERMISSION));
    }
    if ctx.site.id != site_id || ctx.owner.id != user_id {
        return Err(mode.deny(StatusCode::FORBIDDEN, NO_PERMISSION));
    }
    Ok(())
}
