//! Site administration: the admin entry point and the site text editor.

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use log::info;
use std::sync::Arc;

use crate::server::form::FormData;
use crate::server::guards::{
    issue_csrf, login_redirect, require_logged_in, require_permissions, require_site_activated,
    require_site_registered, verify_csrf, CsrfScope, PermissionClaim, ResponseMode,
};
use crate::server::reply::{user_error, HandlerResult, Reply};
use crate::server::session::Session;
use crate::server::state::AppState;

/// `GET /admin/`: send the owner to the site editor, or to login when the site is off.
pub async fn admin_redirect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult<Response> {
    let ctx = require_site_registered(&state, &headers, ResponseMode::Page)?;
    if !ctx.site.active {
        return Ok(Redirect::to(&login_redirect(&ctx.host, &uri)).into_response());
    }
    Ok(Redirect::to("/site/admin").into_response())
}

/// `GET /site/admin/`
pub async fn site_admin_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult {
    let mode = ResponseMode::Page;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    let csrf = issue_csrf(&session, CsrfScope::Site).await;
    let logged_in = require_logged_in(&session, &ctx, &uri, mode).await?;

    Ok(Reply::ok("Site admin")
        .with("site", &ctx.site)
        .with("host", &ctx.host)
        .with("csrf", csrf)
        .with("user_id", logged_in.user_id)
        .with("themes", state.themes.list()))
}

/// `POST /site/update/`: replace every text field of the site.
pub async fn site_update(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    form: FormData,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    verify_csrf(&session, CsrfScope::Site, &form, mode).await?;
    require_logged_in(&session, &ctx, &uri, mode).await?;
    let claim = PermissionClaim::from_form(&form, "id", "user");
    require_permissions(&session, &ctx, claim, mode).await?;

    let template = form.text("site_template");
    if !state.themes.is_empty() && !state.themes.contains(&template) {
        return Ok(Reply::fail(format!("Unknown theme {}", template)));
    }

    let mut site = ctx.site;
    let content = &mut site.content;
    content.site_email = form.text("site_email");
    content.site_owner = form.text("site_owner");
    content.site_template = template;
    content.site_title = form.text("site_title");
    content.site_description = form.text("site_description");
    content.site_copyright = form.text("site_copyright");
    content.page_title = form.text("page_title");
    content.page_content = form.text("page_content");
    content.address = form.text("address");
    content.map_url = form.text("map_url");
    content.phones = form.text("phones");
    content.whats_app_phones = form.text("whats_app_phones");
    content.facebook_url = form.text("facebook_url");
    content.twitter_url = form.text("twitter_url");

    if let Err(e) = state.db.save_site(&mut site) {
        return user_error(e);
    }
    info!("📝 Site {} updated", site.id);

    Ok(Reply::ok("Updated successfully"))
}
