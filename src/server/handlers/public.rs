//! Public page, contact form and health check.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use log::info;
use serde::Deserialize;
use std::sync::Arc;

use super::with_urls;
use crate::common::validation;
use crate::mail::{self, contact_email, Mailbox};
use crate::server::form::FormData;
use crate::server::guards::{
    issue_csrf, require_site_activated, require_site_registered, verify_csrf, CsrfScope,
    ResponseMode,
};
use crate::server::reply::{HandlerResult, Reply};
use crate::server::session::Session;
use crate::server::state::AppState;
use crate::store::run_blocking;

const SEND_FAILED: &str = "Message could not be sent";

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "onepage-cms"
    }))
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    preview: Option<String>,
}

/// `GET /`: everything the public page shows.
///
/// `?preview=<theme>` selects another theme without saving it.
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Query(query): Query<IndexQuery>,
) -> HandlerResult {
    let ctx = require_site_registered(&state, &headers, ResponseMode::Page)?;
    require_site_activated(&ctx, ResponseMode::Page)?;
    let csrf = issue_csrf(&session, CsrfScope::Index).await;

    let img_url = state.img_url(&ctx.host);
    let site_id = ctx.site.id;
    let portfolios = run_blocking(state.db.clone(), move |db| db.portfolios(site_id)).await?;
    let portfolios: Vec<_> = portfolios
        .iter()
        .map(|p| with_urls(p, &p.images, &img_url))
        .collect();

    let template = query
        .preview
        .unwrap_or_else(|| ctx.site.content.site_template.clone());

    let mut reply = Reply::ok("Site found")
        .with("site", &ctx.site)
        .with("host", &ctx.host)
        .with("netloc", &ctx.netloc)
        .with("csrf", &csrf)
        .with("img_url", &img_url)
        .with("portfolios", &portfolios)
        .with("template", &template);

    if let Some(theme) = state.themes.get(&template) {
        let tpl_url = theme.url(&ctx.host, &state.config.themes.url_path);
        reply = reply
            .with("original_tpl", format!("{}{}", tpl_url, theme.original_file_name))
            .with("tpl_url", tpl_url)
            .with("theme", theme);
    }
    Ok(reply)
}

/// `POST /contact/`: forward a visitor's message to the site owner.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    form: FormData,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    verify_csrf(&session, CsrfScope::Index, &form, mode).await?;

    let (Some(site_id), Some(name), Some(email), Some(subject), Some(message)) = (
        form.id("site_id"),
        form.get("name"),
        form.get("email"),
        form.get("subject"),
        form.get("message"),
    ) else {
        return Ok(Reply::fail(SEND_FAILED));
    };

    if site_id != ctx.site.id {
        return Ok(Reply::fail(SEND_FAILED));
    }
    if !validation::email(email) {
        return Ok(Reply::fail("Invalid email"));
    }

    let visitor = Mailbox::new(name, email);
    info!("✉️  Contact message from {}", visitor.address);
    mail::dispatch(
        state.mailer.clone(),
        contact_email(&ctx.host, visitor, &ctx.site, subject, message),
    );

    Ok(Reply::ok("Thank you! Message sent successfully"))
}
