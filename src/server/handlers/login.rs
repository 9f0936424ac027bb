//! Login, logout and the "forgot my password" request.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Extension;
use log::info;
use serde::Deserialize;
use std::sync::Arc;

use crate::mail::{self, recovery_email};
use crate::server::form::FormData;
use crate::server::guards::{
    issue_csrf, require_site_activated, require_site_registered, verify_csrf, CsrfScope,
    ResponseMode,
};
use crate::server::reply::{HandlerResult, Reply};
use crate::server::session::Session;
use crate::server::state::AppState;
use crate::store::verify_password;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    redirect_url: Option<String>,
}

/// `GET /login/`: ends any current session and issues the login form token.
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> HandlerResult {
    let ctx = require_site_registered(&state, &headers, ResponseMode::Page)?;
    let csrf = issue_csrf(&session, CsrfScope::Login).await;
    session.logout().await;

    Ok(Reply::ok("Login")
        .with("site", &ctx.site)
        .with("host", &ctx.host)
        .with("csrf", csrf)
        .with("redirect_url", query.redirect_url))
}

/// `POST /login/`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    form: FormData,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    verify_csrf(&session, CsrfScope::Login, &form, mode).await?;
    session.logout().await;

    let Some(user) = state.db.user_by_email(&form.text("email"))? else {
        return Ok(Reply::fail("User not found"));
    };
    if user.id != ctx.owner.id {
        return Ok(Reply::fail("No permission to access"));
    }
    if !user.active {
        return Ok(Reply::fail("Inactive user"));
    }
    if !verify_password(&form.text("password"), &user.password) {
        return Ok(Reply::fail("Wrong password"));
    }

    session.login(user.id).await;
    info!("🔑 {} logged in", user.email);

    Ok(Reply::ok("Logged in successfully").with("redirect_url", form.get("redirect_url")))
}

/// `POST /login/recovery/`: mail a recovery link to the account owner.
pub async fn login_recovery(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    form: FormData,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    verify_csrf(&session, CsrfScope::Login, &form, mode).await?;
    session.logout().await;

    let Some(user) = state.db.user_by_email(&form.text("email"))? else {
        return Ok(Reply::fail("User not found"));
    };
    if state.db.site_by_user(user.id)?.is_none() {
        return Ok(Reply::fail("Site not found"));
    }

    info!("📨 Password recovery requested for {}", user.email);
    mail::dispatch(
        state.mailer.clone(),
        recovery_email(&ctx.host, state.config.mail.sender(), &user),
    );

    Ok(Reply::ok(
        "Password recovery requested. Check your email to recover your password.",
    ))
}

/// `GET|POST /logout/`
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    session.logout().await;

    Ok(Reply::ok("Logged out successfully"))
}
