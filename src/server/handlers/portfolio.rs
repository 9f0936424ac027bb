//! Portfolio administration. Every portfolio carries a cover image stored as
//! `portfolio{n}.jpg` plus its normalized and thumbnail variants.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use axum::Extension;
use log::{info, warn};
use std::sync::Arc;

use super::{with_urls, WithUrls};
use crate::processing::upload::remove_images;
use crate::server::form::FormData;
use crate::server::guards::{
    issue_csrf, require_logged_in, require_permissions, require_site_activated,
    require_site_registered, verify_csrf, CsrfScope, PermissionClaim, ResponseMode, SiteContext,
};
use crate::server::reply::{user_error, HandlerResult, Reply};
use crate::server::session::Session;
use crate::server::state::AppState;
use crate::store::{run_blocking, NewEntry, Portfolio};

const NOT_FOUND: &str = "Portfolio not found";
pub(crate) const NO_UPLOAD: &str = "No image uploaded";

fn listed<'a>(portfolios: &'a [Portfolio], img_url: &str) -> Vec<WithUrls<'a, Portfolio>> {
    portfolios
        .iter()
        .map(|p| with_urls(p, &p.images, img_url))
        .collect()
}

async fn site_portfolios(state: &AppState, site_id: i64) -> HandlerResult<Vec<Portfolio>> {
    Ok(run_blocking(state.db.clone(), move |db| db.portfolios(site_id)).await?)
}

/// Guard chain shared by the add, delete and update forms.
async fn admin_form_guards(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    uri: &Uri,
    form: &FormData,
) -> HandlerResult<SiteContext> {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(state, headers, mode)?;
    require_site_activated(&ctx, mode)?;
    verify_csrf(session, CsrfScope::Portfolios, form, mode).await?;
    require_logged_in(session, &ctx, uri, mode).await?;
    let claim = PermissionClaim::from_form(form, "site", "user");
    require_permissions(session, &ctx, claim, mode).await?;
    Ok(ctx)
}

/// `GET /portfolios/admin/`
pub async fn portfolios_admin_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult {
    let mode = ResponseMode::Page;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    let csrf = issue_csrf(&session, CsrfScope::Portfolios).await;
    let logged_in = require_logged_in(&session, &ctx, &uri, mode).await?;

    let img_url = state.img_url(&ctx.host);
    let portfolios = site_portfolios(&state, ctx.site.id).await?;

    Ok(Reply::ok("Portfolios admin")
        .with("site", &ctx.site)
        .with("host", &ctx.host)
        .with("csrf", csrf)
        .with("user_id", logged_in.user_id)
        .with("img_url", &img_url)
        .with("portfolio_list", listed(&portfolios, &img_url)))
}

/// `GET /portfolio/get/:site_id/:user_id/:portfolio_id/`
pub async fn portfolio_get(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Path((site_id, user_id, portfolio_id)): Path<(i64, i64, i64)>,
) -> HandlerResult {
    let mode = ResponseMode::Json;
    let ctx = require_site_registered(&state, &headers, mode)?;
    require_site_activated(&ctx, mode)?;
    require_permissions(&session, &ctx, PermissionClaim::from_path(site_id, user_id), mode).await?;

    let Some(portfolio) = state.db.portfolio(ctx.site.id, portfolio_id)? else {
        return Ok(Reply::fail(NOT_FOUND));
    };
    let img_url = state.img_url(&ctx.host);

    Ok(Reply::ok("Portfolio found").merge(with_urls(&portfolio, &portfolio.images, &img_url)))
}

/// `POST /portfolio/add/` (multipart): `title`, `description` and the `upload` image.
pub async fn portfolio_add(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    mut form: FormData,
) -> HandlerResult {
    let ctx = admin_form_guards(&state, &session, &headers, &uri, &form).await?;

    let Some(upload) = form.take_upload() else {
        return Ok(Reply::fail(NO_UPLOAD));
    };
    let start_index = state.db.last_portfolio_id(ctx.site.id)?.unwrap_or(0) + 1;
    let dir = state.image_dir(ctx.site.id)?;
    let img_url = state.img_url(&ctx.host);

    let stored = match state
        .pipeline
        .store_new(upload, "portfolio", start_index, dir.clone(), &img_url)
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
    let portfolio = match state.db.insert_portfolio(ctx.site.id, &new) {
        Ok(portfolio) => portfolio,
        Err(e) => {
            warn!("Discarding images of failed portfolio insert: {}", e);
            remove_images(&dir, &stored.names);
            return user_error(e);
        }
    };
    info!("📁 Portfolio {} added", portfolio.id);

    let portfolios = site_portfolios(&state, ctx.site.id).await?;
    Ok(Reply::ok("Added successfully")
        .with("portfolio_id", portfolio.id)
        .merge(&stored.urls)
        .with("portfolio_list", listed(&portfolios, &img_url)))
}

/// `POST /portfolio/delete/`: removes the portfolio, its pictures and all their files.
pub async fn portfolio_delete(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    form: FormData,
) -> HandlerResult {
    let ctx = admin_form_guards(&state, &session, &headers, &uri, &form).await?;

    let portfolio_id = form.id("portfolio").unwrap_or(0);
    let Some(portfolio) = state.db.portfolio(ctx.site.id, portfolio_id)? else {
        return Ok(Reply::fail(NOT_FOUND));
    };

    let (site_id, id) = (ctx.site.id, portfolio.id);
    let pictures = run_blocking(state.db.clone(), move |db| {
        let pictures = db.pictures(site_id, id)?;
        db.delete_portfolio(id)?;
        Ok(pictures)
    })
    .await?;

    let dir = state.image_dir(ctx.site.id)?;
    for picture in &pictures {
        remove_images(&dir, &picture.images);
    }
    remove_images(&dir, &portfolio.images);
    info!(
        "🗑️  Portfolio {} deleted with {} pictures",
        portfolio.id,
        pictures.len()
    );

    let img_url = state.img_url(&ctx.host);
    let portfolios = site_portfolios(&state, ctx.site.id).await?;
    Ok(Reply::ok("Deleted successfully")
        .with("portfolio_id", portfolio.id)
        .with("portfolio_list", listed(&portfolios, &img_url)))
}

/// `POST /portfolio/update/` (multipart): new texts and, optionally, a new image under
/// the same filenames.
pub async fn portfolio_update(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    mut form: FormData,
) -> HandlerResult {
    let ctx = admin_form_guards(&state, &session, &headers, &uri, &form).await?;

    let portfolio_id = form.id("portfolio").unwrap_or(0);
    let Some(mut portfolio) = state.db.portfolio(ctx.site.id, portfolio_id)? else {
        return Ok(Reply::fail(NOT_FOUND));
    };

    if let Some(upload) = form.take_upload() {
        let dir = state.image_dir(ctx.site.id)?;
        if let Err(e) = state
            .pipeline
            .replace(upload, dir, portfolio.images.clone())
            .await
        {
            return user_error(e);
        }
    }

    portfolio.title = form.text("title");
    portfolio.description = form.text("description");
    state.db.save_portfolio(&mut portfolio)?;
    info!("📝 Portfolio {} updated", portfolio.id);

    let img_url = state.img_url(&ctx.host);
    let portfolios = site_portfolios(&state, ctx.site.id).await?;
    Ok(Reply::ok("Updated successfully")
        .with("portfolio_id", portfolio.id)
        .merge(portfolio.images.urls(&img_url))
        .with("portfolio_list", listed(&portfolios, &img_url)))
}

#[cfg(test)]
mod tests {
    use crate::processing::backend::tests::sample_jpeg;
    use crate::server::handlers::test_support::TestApp;

    async fn add(app: &mut TestApp, csrf: &str, title: &str) -> serde_json::Value {
        let image = sample_jpeg(500, 300);
        app.post_multipart(
            "/portfolio/add/",
            &[
                ("csrf", csrf),
                ("site", "1"),
                ("user", "1"),
                ("title", title),
                ("description", "Shots"),
            ],
            Some(("cover.JPG", &image[..])),
        )
        .await
        .json
    }

    #[tokio::test]
    async fn add_stores_three_files_and_lists_them() {
        let mut app = TestApp::new().await;
        app.login().await;
        let csrf = app.csrf("/portfolios/admin/").await;

        let reply = add(&mut app, &csrf, "Weddings").await;
        assert_eq!(reply["status"], true, "{}", reply);
        assert_eq!(reply["portfolio_id"], 1);
        assert_eq!(reply["original"], "http://example.com/img/portfolio1.jpg");
        assert_eq!(reply["thumbnail"], "http://example.com/img/portfolio1_thumb.jpg");
        assert_eq!(reply["portfolio_list"][0]["title"], "Weddings");

        let dir = app.state.image_dir(1).unwrap();
        for name in ["portfolio1.jpg", "portfolio1_norm.jpg", "portfolio1_thumb.jpg"] {
            assert!(dir.join(name).is_file(), "{} missing", name);
        }

        let second = add(&mut app, &csrf, "Parties").await;
        assert_eq!(second["original"], "http://example.com/img/portfolio2.jpg");
    }

    #[tokio::test]
    async fn add_rejects_bad_uploads() {
        let mut app = TestApp::new().await;
        app.login().await;
        let csrf = app.csrf("/portfolios/admin/").await;
        let fields = [("csrf", csrf.as_str()), ("site", "1"), ("user", "1")];

        let none = app.post_multipart("/portfolio/add/", &fields, None).await;
        assert_eq!(none.json["info"], "No image uploaded");

        let png = app
            .post_multipart("/portfolio/add/", &fields, Some(("cover.png", &b"png"[..])))
            .await;
        assert_eq!(png.json["info"], "Unsupported file type");

        let small = sample_jpeg(100, 100);
        let too_small = app
            .post_multipart("/portfolio/add/", &fields, Some(("cover.jpg", &small[..])))
            .await;
        assert_eq!(too_small.json["status"], false);
        assert!(app.state.db.portfolios(1).unwrap().is_empty());
        assert!(!app.state.image_dir(1).unwrap().join("portfolio1.jpg").exists());
    }

    #[tokio::test]
    async fn get_update_and_delete() {
        let mut app = TestApp::new().await;
        app.login().await;
        let csrf = app.csrf("/portfolios/admin/").await;
        add(&mut app, &csrf, "Weddings").await;

        let got = app.get("/portfolio/get/1/1/1/").await;
        assert_eq!(got.json["title"], "Weddings");
        assert_eq!(got.json["normalized"], "http://example.com/img/portfolio1_norm.jpg");

        let missing = app.get("/portfolio/get/1/1/9/").await;
        assert_eq!(missing.json["info"], "Portfolio not found");

        let image = sample_jpeg(300, 600);
        let updated = app
            .post_multipart(
                "/portfolio/update/",
                &[
                    ("csrf", &csrf),
                    ("site", "1"),
                    ("user", "1"),
                    ("portfolio", "1"),
                    ("title", "Events"),
                    ("description", ""),
                ],
                Some(("new.jpeg", &image[..])),
            )
            .await;
        assert_eq!(updated.json["status"], true, "{}", updated.json);
        assert_eq!(updated.json["original"], "http://example.com/img/portfolio1.jpg");
        assert_eq!(app.state.db.portfolio(1, 1).unwrap().unwrap().title, "Events");

        let deleted = app
            .post(
                "/portfolio/delete/",
                &[("csrf", &csrf), ("site", "1"), ("user", "1"), ("portfolio", "1")],
            )
            .await;
        assert_eq!(deleted.json["status"], true, "{}", deleted.json);
        assert!(app.state.db.portfolio(1, 1).unwrap().is_none());
        assert!(!app.state.image_dir(1).unwrap().join("portfolio1.jpg").exists());
    }

    #[tokio::test]
    async fn get_requires_the_owner_session() {
        let mut app = TestApp::new().await;
        let response = app.get("/portfolio/get/1/1/1/").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.json["info"], "No permission to access");
    }
}
