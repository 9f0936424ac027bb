//! Account settings and password recovery.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Extension;
use log::info;
use std::sync::Arc;

use crate::server::form::FormData;
use crate::server::guards::{
    issue_csrf, require_logged_in, require_site_activated, require_site_registered, verify_csrf,
    CsrfScope, ResponseMode,
};
use crate::server::reply::{user_error, HandlerResult, Rejection, Reply};
use crate::server::session::Session;
use crate::server::state::AppState;
use crate::store::hash_password;

const NO_PERMISSION: &str = "No permission to access";
const PASSWORDS_DIFFER: &str = "Passwords do not match";

/// `GET /user/admin/`
pub async fn user_admin_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult {
    let mode = ResponseMode::Page;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    let csrf = issue_csrf(&session, CsrfScope::User).await;
    let logged_in = require_logged_in(&session, &ctx, &uri, mode).await?;

    let user = state.db.user_by_id(logged_in.user_id)?.ok_or_else(|| {
        Rejection::Abort(StatusCode::NOT_FOUND, "User not found".to_string())
    })?;

    Ok(Reply::ok("User admin")
        .with("site", &ctx.site)
        .with("host", &ctx.host)
        .with("user", &user)
        .with("csrf", csrf)
        .with("user_id", logged_in.user_id))
}

/// `POST /user/update/`: change email, name and optionally the password.
pub async fn user_update(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    form: FormData,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    verify_csrf(&session, CsrfScope::User, &form, mode).await?;
    let logged_in = require_logged_in(&session, &ctx, &uri, mode).await?;

    if form.id("id") != Some(logged_in.user_id) {
        session.logout().await;
        return Ok(Reply::fail(NO_PERMISSION));
    }
    let password = form.text("password1");
    if password != form.text("password2") {
        return Ok(Reply::fail(PASSWORDS_DIFFER));
    }

    let Some(mut user) = state.db.user_by_id(logged_in.user_id)? else {
        return Ok(Reply::fail("User not found"));
    };

    let email = form.text("email");
    if user.email != email && state.db.user_by_email(&email)?.is_some() {
        return Ok(Reply::fail("Email already registered"));
    }

    user.email = email;
    user.name = form.text("name");
    if !password.is_empty() {
        user.password = hash_password(&password);
    }
    if let Err(e) = state.db.save_user(&mut user) {
        return user_error(e);
    }
    info!("👤 User {} updated", user.id);

    Ok(Reply::ok("Updated successfully"))
}

/// `GET /user/recovery/:user_id/:user_hash/`: log in through a recovery link.
///
/// The reply's `recovery` flag tells whether the link was valid.
pub async fn user_recovery_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Path((user_id, user_hash)): Path<(i64, String)>,
) -> HandlerResult {
    let mode = ResponseMode::Page;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    let csrf = issue_csrf(&session, CsrfScope::Recovery).await;
    session.logout().await;

    let denied = Reply::ok("Password recovery")
        .with("site", &ctx.site)
        .with("host", &ctx.host)
        .with("csrf", &csrf)
        .with("recovery", false);

    let Some(user) = state.db.user_by_recovery(user_id, &user_hash)? else {
        return Ok(denied);
    };
    let Some(site) = state.db.site_by_user(user.id)? else {
        return Ok(denied);
    };
    if !user.active || !site.active {
        return Ok(denied);
    }

    session.login(user.id).await;
    info!("🔓 {} logged in through a recovery link", user.email);

    Ok(Reply::ok("Password recovery")
        .with("site", &site)
        .with("host", &ctx.host)
        .with("csrf", &csrf)
        .with("recovery", true)
        .with("user", &user))
}

/// `POST /user/recovery/`: set a new password after following a recovery link.
pub async fn user_recovery(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    form: FormData,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    verify_csrf(&session, CsrfScope::Recovery, &form, mode).await?;
    let logged_in = require_logged_in(&session, &ctx, &uri, mode).await?;

    if form.id("id") != Some(logged_in.user_id) {
        session.logout().await;
        return Ok(Reply::fail(NO_PERMISSION));
    }
    let password = form.text("password1");
    if password != form.text("password2") {
        return Ok(Reply::fail(PASSWORDS_DIFFER));
    }

    let Some(mut user) = state.db.user_by_id(logged_in.user_id)? else {
        return Ok(Reply::fail("User not found"));
    };
    if state.db.site_by_user(user.id)?.is_none() {
        return Ok(Reply::fail("Site not found"));
    }

    if !password.is_empty() {
        user.password = hash_password(&password);
    }
    if let Err(e) = state.db.save_user(&mut user) {
        return user_error(e);
    }
    info!("🔑 Password of user {} reset", user.id);

    Ok(Reply::ok("Updated successfully"))
}

#[cfg(test)]
mod tests {
    use crate::server::handlers::test_support::TestApp;
    use crate::store::verify_password;

    #[tokio::test]
    async fn user_admin_shows_account_without_secrets() {
        let mut app = TestApp::new().await;
        app.login().await;
        let response = app.get("/user/admin/").await;

        assert_eq!(response.json["user"]["email"], "admin@localhost.com");
        assert!(response.json["user"].get("password").is_none());
        assert!(response.json["user"].get("user_hash").is_none());
    }

    #[tokio::test]
    async fn update_changes_name_and_password() {
        let mut app = TestApp::new().await;
        app.login().await;
        let csrf = app.csrf("/user/admin/").await;

        let mismatch = app
            .post(
                "/user/update/",
                &[
                    ("csrf", &csrf),
                    ("id", "1"),
                    ("email", "admin@localhost.com"),
                    ("name", "Jane"),
                    ("password1", "a"),
                    ("password2", "b"),
                ],
            )
            .await;
        assert_eq!(mismatch.json["info"], "Passwords do not match");

        let ok = app
            .post(
                "/user/update/",
                &[
                    ("csrf", &csrf),
                    ("id", "1"),
                    ("email", "admin@localhost.com"),
                    ("name", "Jane"),
                    ("password1", "secret"),
                    ("password2", "secret"),
                ],
            )
            .await;
        assert_eq!(ok.json["status"], true, "{}", ok.json);

        let user = app.state.db.user_by_id(1).unwrap().unwrap();
        assert_eq!(user.name, "Jane");
        assert!(verify_password("secret", &user.password));
    }

    #[tokio::test]
    async fn update_for_another_user_logs_out() {
        let mut app = TestApp::new().await;
        app.login().await;
        let csrf = app.csrf("/user/admin/").await;

        let response = app
            .post(
                "/user/update/",
                &[("csrf", &csrf), ("id", "2"), ("email", "x@example.com")],
            )
            .await;
        assert_eq!(response.json["info"], "No permission to access");
        assert_eq!(app.get("/user/admin/").await.status, 303);
    }

    #[tokio::test]
    async fn recovery_link_logs_in_and_resets_password() {
        let mut app = TestApp::new().await;
        let user = app.state.db.user_by_id(1).unwrap().unwrap();

        let bad = app.get("/user/recovery/1/deadbeef/").await;
        assert_eq!(bad.json["recovery"], false);

        let page = app
            .get(&format!("/user/recovery/1/{}/", user.user_hash))
            .await;
        assert_eq!(page.json["recovery"], true, "{}", page.json);
        let csrf = page.json["csrf"].as_str().unwrap().to_string();

        let response = app
            .post(
                "/user/recovery/",
                &[
                    ("csrf", &csrf),
                    ("id", "1"),
                    ("password1", "fresh"),
                    ("password2", "fresh"),
                ],
            )
            .await;
        assert_eq!(response.json["status"], true, "{}", response.json);

        let updated = app.state.db.user_by_id(1).unwrap().unwrap();
        assert!(verify_password("fresh", &updated.password));
    }
}
