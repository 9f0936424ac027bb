//! Picture administration inside a portfolio. Pictures are stored as
//! `picture{n}.jpg` plus their normalized and thumbnail variants.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Extension;
use log::{info, warn};
use std::sync::Arc;

use super::portfolio::NO_UPLOAD;
use super::{with_urls, WithUrls};
use crate::processing::upload::remove_images;
use crate::server::form::FormData;
use crate::server::guards::{
    issue_csrf, require_logged_in, require_permissions, require_site_activated,
    require_site_registered, verify_csrf, CsrfScope, PermissionClaim, ResponseMode, SiteContext,
};
use crate::server::reply::{user_error, HandlerResult, Rejection, Reply};
use crate::server::session::Session;
use crate::server::state::AppState;
use crate::store::{run_blocking, NewEntry, Picture, Portfolio};

const PORTFOLIO_NOT_FOUND: &str = "Portfolio not found";
const NOT_FOUND: &str = "Picture not found";

fn listed<'a>(pictures: &'a [Picture], img_url: &str) -> Vec<WithUrls<'a, Picture>> {
    pictures
        .iter()
        .map(|p| with_urls(p, &p.images, img_url))
        .collect()
}

async fn portfolio_pictures(
    state: &AppState,
    site_id: i64,
    portfolio_id: i64,
) -> HandlerResult<Vec<Picture>> {
    Ok(run_blocking(state.db.clone(), move |db| db.pictures(site_id, portfolio_id)).await?)
}

/// Guards of the add, delete and update forms, plus the portfolio they target.
async fn admin_form_guards(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    uri: &Uri,
    form: &FormData,
) -> HandlerResult<(SiteContext, Option<Portfolio>)> {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(state, headers, mode)?;
    require_site_activated(&ctx, mode)?;
    verify_csrf(session, CsrfScope::Pictures, form, mode).await?;
    require_logged_in(session, &ctx, uri, mode).await?;
    let claim = PermissionClaim::from_form(form, "site", "user");
    require_permissions(session, &ctx, claim, mode).await?;

    let portfolio = state
        .db
        .portfolio(ctx.site.id, form.id("portfolio").unwrap_or(0))?;
    Ok((ctx, portfolio))
}

/// `GET /pictures/admin/:site_id/:user_id/:portfolio_id/`
pub async fn pictures_admin_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    Path((site_id, user_id, portfolio_id)): Path<(i64, i64, i64)>,
) -> HandlerResult {
    let mode = ResponseMode::Page;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    let csrf = issue_csrf(&session, CsrfScope::Pictures).await;
    let logged_in = require_logged_in(&session, &ctx, &uri, mode).await?;
    require_permissions(&session, &ctx, PermissionClaim::from_path(site_id, user_id), mode).await?;

    let portfolio = state
        .db
        .portfolio(ctx.site.id, portfolio_id)?
        .ok_or_else(|| Rejection::Abort(StatusCode::NOT_FOUND, PORTFOLIO_NOT_FOUND.to_string()))?;

    let img_url = state.img_url(&ctx.host);
    let pictures = portfolio_pictures(&state, ctx.site.id, portfolio.id).await?;

    Ok(Reply::ok("Pictures admin")
        .with("site", &ctx.site)
        .with("host", &ctx.host)
        .with("csrf", csrf)
        .with("user_id", logged_in.user_id)
        .with("img_url", &img_url)
        .with("portfolio", with_urls(&portfolio, &portfolio.images, &img_url))
        .with("picture_list", listed(&pictures, &img_url)))
}

/// `GET /picture/get/:site_id/:user_id/:portfolio_id/:picture_id/`
pub async fn picture_get(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Path((site_id, user_id, portfolio_id, picture_id)): Path<(i64, i64, i64, i64)>,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    require_permissions(&session, &ctx, PermissionClaim::from_path(site_id, user_id), mode).await?;

    let Some(portfolio) = state.db.portfolio(ctx.site.id, portfolio_id)? else {
        return Ok(Reply::fail(PORTFOLIO_NOT_FOUND));
    };
    let Some(picture) = state.db.picture(ctx.site.id, portfolio.id, picture_id)? else {
        return Ok(Reply::fail(NOT_FOUND));
    };
    let img_url = state.img_url(&ctx.host);

    Ok(Reply::ok("Picture found").merge(with_urls(&picture, &picture.images, &img_url)))
}

/// `POST /picture/add/` (multipart): `portfolio`, `title`, `description` and the image.
pub async fn picture_add(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    mut form: FormData,
) -> HandlerResult {
    let (ctx, portfolio) = admin_form_guards(&state, &session, &headers, &uri, &form).await?;
    let Some(portfolio) = portfolio else {
        return Ok(Reply::fail(PORTFOLIO_NOT_FOUND));
    };

    let Some(upload) = form.take_upload() else {
        return Ok(Reply::fail(NO_UPLOAD));
    };
    let start_index = state.db.last_picture_id(ctx.site.id)?.unwrap_or(0) + 1;
    let dir = state.image_dir(ctx.site.id)?;
    let img_url = state.img_url(&ctx.host);

    let stored = match state
        .pipeline
        .store_new(upload, "picture", start_index, dir.clone(), &img_url)
        .await
    {
        Ok(stored) => stored,
        Err(e) => return user_error(e),
    };

    let new = NewEntry {
        title: form.text("title"),
        description: form.text("description"),
        images: stored.names.clone(),
    };
    let picture = match state.db.insert_picture(ctx.site.id, portfolio.id, &new) {
        Ok(picture) => picture,
        Err(e) => {
            warn!("Discarding images of failed picture insert: {}", e);
            remove_images(&dir, &stored.names);
            return user_error(e);
        }
    };
    info!("🖼️  Picture {} added to portfolio {}", picture.id, portfolio.id);

    let pictures = portfolio_pictures(&state, ctx.site.id, portfolio.id).await?;
    Ok(Reply::ok("Added successfully")
        .with("picture_id", picture.id)
        .merge(&stored.urls)
        .with("picture_list", listed(&pictures, &img_url)))
}

/// `POST /picture/delete/`
pub async fn picture_delete(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    form: FormData,
) -> HandlerResult {
    let (ctx, portfolio) = admin_form_guards(&state, &session, &headers, &uri, &form).await?;
    let Some(portfolio) = portfolio else {
        return Ok(Reply::fail(PORTFOLIO_NOT_FOUND));
    };
    let picture_id = form.id("picture").unwrap_or(0);
    let Some(picture) = state.db.picture(ctx.site.id, portfolio.id, picture_id)? else {
        return Ok(Reply::fail(NOT_FOUND));
    };

    let id = picture.id;
    run_blocking(state.db.clone(), move |db| db.delete_picture(id)).await?;
    remove_images(&state.image_dir(ctx.site.id)?, &picture.images);
    info!("🗑️  Picture {} deleted", picture.id);

    let img_url = state.img_url(&ctx.host);
    let pictures = portfolio_pictures(&state, ctx.site.id, portfolio.id).await?;
    Ok(Reply::ok("Deleted successfully")
        .with("picture_id", picture.id)
        .with("picture_list", listed(&pictures, &img_url)))
}

/// `POST /picture/update/` (multipart): new texts and an optional replacement image.
pub async fn picture_update(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    mut form: FormData,
) -> HandlerResult {
    let (ctx, portfolio) = admin_form_guards(&state, &session, &headers, &uri, &form).await?;
    let Some(portfolio) = portfolio else {
        return Ok(Reply::fail(PORTFOLIO_NOT_FOUND));
    };
    let picture_id = form.id("picture").unwrap_or(0);
    let Some(mut picture) = state.db.picture(ctx.site.id, portfolio.id, picture_id)? else {
        return Ok(Reply::fail(NOT_FOUND));
    };

    if let Some(upload) = form.take_upload() {
        let dir = state.image_dir(ctx.site.id)?;
        if let Err(e) = state
            .pipeline
            .replace(upload, dir, picture.images.clone())
            .await
        {
            return user_error(e);
        }
    }

    picture.title = form.text("title");
    picture.description = form.text("description");
    state.db.save_picture(&mut picture)?;
    info!("📝 Picture {} updated", picture.id);

    let img_url = state.img_url(&ctx.host);
    let pictures = portfolio_pictures(&state, ctx.site.id, portfolio.id).await?;
    Ok(Reply::ok("Updated successfully")
        .with("picture_id", picture.id)
        .merge(picture.images.urls(&img_url))
        .with("picture_list", listed(&pictures, &img_url)))
}

#[cfg(test)]
mod tests {
    use crate::processing::backend::tests::sample_jpeg;
    use crate::server::handlers::test_support::TestApp;

    /// Logged-in app with one portfolio; returns the pictures CSRF token.
    async fn with_portfolio(app: &mut TestApp) -> String {
        app.login().await;
        let csrf = app.csrf("/portfolios/admin/").await;
        let image = sample_jpeg(400, 400);
        let reply = app
            .post_multipart(
                "/portfolio/add/",
                &[("csrf", &csrf), ("site", "1"), ("user", "1"), ("title", "Trips")],
                Some(("cover.jpg", &image[..])),
            )
            .await;
        assert_eq!(reply.json["status"], true, "{}", reply.json);
        app.csrf("/pictures/admin/1/1/1/").await
    }

    async fn add_picture(app: &mut TestApp, csrf: &str, portfolio: &str) -> serde_json::Value {
        let image = sample_jpeg(800, 450);
        app.post_multipart(
            "/picture/add/",
            &[
                ("csrf", csrf),
                ("site", "1"),
                ("user", "1"),
                ("portfolio", portfolio),
                ("title", "Beach"),
                ("description", "Sunset"),
            ],
            Some(("beach.jpg", &image[..])),
        )
        .await
        .json
    }

    #[tokio::test]
    async fn admin_page_needs_an_existing_portfolio() {
        let mut app = TestApp::new().await;
        with_portfolio(&mut app).await;

        let ok = app.get("/pictures/admin/1/1/1/").await;
        assert_eq!(ok.status, 200);
        assert_eq!(ok.json["portfolio"]["title"], "Trips");

        assert_eq!(app.get("/pictures/admin/1/1/7/").await.status, 404);
        assert_eq!(app.get("/pictures/admin/2/1/1/").await.status, 403);
    }

    #[tokio::test]
    async fn add_get_update_delete() {
        let mut app = TestApp::new().await;
        let csrf = with_portfolio(&mut app).await;

        let added = add_picture(&mut app, &csrf, "1").await;
        assert_eq!(added["status"], true, "{}", added);
        assert_eq!(added["picture_id"], 1);
        assert_eq!(added["original"], "http://example.com/img/picture1.jpg");
        assert_eq!(added["picture_list"][0]["title"], "Beach");

        let got = app.get("/picture/get/1/1/1/1/").await;
        assert_eq!(got.json["description"], "Sunset");
        assert_eq!(got.json["thumbnail"], "http://example.com/img/picture1_thumb.jpg");
        assert_eq!(
            app.get("/picture/get/1/1/1/5/").await.json["info"],
            "Picture not found"
        );

        let updated = app
            .post_multipart(
                "/picture/update/",
                &[
                    ("csrf", &csrf),
                    ("site", "1"),
                    ("user", "1"),
                    ("portfolio", "1"),
                    ("picture", "1"),
                    ("title", "Dawn"),
                ],
                None,
            )
            .await;
        assert_eq!(updated.json["status"], true, "{}", updated.json);
        assert_eq!(app.state.db.picture(1, 1, 1).unwrap().unwrap().title, "Dawn");

        let deleted = app
            .post(
                "/picture/delete/",
                &[
                    ("csrf", &csrf),
                    ("site", "1"),
                    ("user", "1"),
                    ("portfolio", "1"),
                    ("picture", "1"),
                ],
            )
            .await;
        assert_eq!(deleted.json["status"], true, "{}", deleted.json);
        assert!(deleted.json["picture_list"].as_array().unwrap().is_empty());
        assert!(!app.state.image_dir(1).unwrap().join("picture1.jpg").exists());
    }

    #[tokio::test]
    async fn unknown_portfolio_is_reported() {
        let mut app = TestApp::new().await;
        let csrf = with_portfolio(&mut app).await;

        let reply = add_picture(&mut app, &csrf, "42").await;
        assert_eq!(reply["info"], "Portfolio not found");
    }

    #[tokio::test]
    async fn deleting_a_portfolio_removes_its_pictures() {
        let mut app = TestApp::new().await;
        let csrf = with_portfolio(&mut app).await;
        add_picture(&mut app, &csrf, "1").await;

        let portfolios_csrf = app.csrf("/portfolios/admin/").await;
        let deleted = app
            .post(
                "/portfolio/delete/",
                &[
                    ("csrf", &portfolios_csrf),
                    ("site", "1"),
                    ("user", "1"),
                    ("portfolio", "1"),
                ],
            )
            .await;
        assert_eq!(deleted.json["status"], true, "{}", deleted.json);
        assert!(app.state.db.pictures(1, 1).unwrap().is_empty());
        assert!(!app.state.image_dir(1).unwrap().join("picture1_norm.jpg").exists());
    }
}
