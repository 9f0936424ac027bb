//! # Router
//!
//! Maps every route to its handler. Dynamic routes carry the session and body-limit
//! layers; the image and theme mounts only check that the site is registered and
//! active. Logging and the optional CORS layer wrap everything. Page routes answer
//! with and without the trailing slash.

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use super::guards::require_active_site;
use super::handlers::{login, picture, portfolio, public, site, user};
use super::session::session_layer;
use super::state::AppState;
use crate::store::MAIN_SITE_ID;

/// Build the application router.
///
/// # Arguments
/// - `state`: Shared state handed to every handler
///
/// # Example
/// ```ignore
/// let app = build_router(state);
/// axum::serve(listener, app).await?;
/// ```
pub fn build_router(state: Arc<AppState>) -> Router {
    let config = &state.config;

    let pages = Router::new()
        .route("/", get(public::index))
        .route("/contact", post(public::contact))
        .route("/contact/", post(public::contact))
        // ====================================================================
        // Login
        // ====================================================================
        .route("/login", get(login::login_page).post(login::login))
        .route("/login/", get(login::login_page).post(login::login))
        .route("/login/recovery", post(login::login_recovery))
        .route("/login/recovery/", post(login::login_recovery))
        .route("/logout", get(login::logout).post(login::logout))
        .route("/logout/", get(login::logout).post(login::logout))
        // ====================================================================
        // Site and user administration
        // ====================================================================
        .route("/admin", get(site::admin_redirect))
        .route("/admin/", get(site::admin_redirect))
        .route("/site/admin", get(site::site_admin_page))
        .route("/site/admin/", get(site::site_admin_page))
        .route("/site/update", post(site::site_update))
        .route("/site/update/", post(site::site_update))
        .route("/user/admin", get(user::user_admin_page))
        .route("/user/admin/", get(user::user_admin_page))
        .route("/user/update", post(user::user_update))
        .route("/user/update/", post(user::user_update))
        .route(
            "/user/recovery/:user_id/:user_hash",
            get(user::user_recovery_page),
        )
        .route(
            "/user/recovery/:user_id/:user_hash/",
            get(user::user_recovery_page),
        )
        .route("/user/recovery", post(user::user_recovery))
        .route("/user/recovery/", post(user::user_recovery))
        // ====================================================================
        // Portfolios
        // ====================================================================
        .route("/portfolios/admin", get(portfolio::portfolios_admin_page))
        .route("/portfolios/admin/", get(portfolio::portfolios_admin_page))
        .route(
            "/portfolio/get/:site_id/:user_id/:portfolio_id",
            get(portfolio::portfolio_get),
        )
        .route(
            "/portfolio/get/:site_id/:user_id/:portfolio_id/",
            get(portfolio::portfolio_get),
        )
        .route("/portfolio/add", post(portfolio::portfolio_add))
        .route("/portfolio/add/", post(portfolio::portfolio_add))
        .route(
            "/portfolio/delete",
            post(portfolio::portfolio_delete),
        )
        .route(
            "/portfolio/delete/",
            post(portfolio::portfolio_delete),
        )
        .route(
            "/portfolio/update",
            post(portfolio::portfolio_update),
        )
        .route(
            "/portfolio/update/",
            post(portfolio::portfolio_update),
        )
        // ====================================================================
        // Pictures
        // ====================================================================
        .route(
            "/pictures/admin/:site_id/:user_id/:portfolio_id",
            get(picture::pictures_admin_page),
        )
        .route(
            "/pictures/admin/:site_id/:user_id/:portfolio_id/",
            get(picture::pictures_admin_page),
        )
        .route(
            "/picture/get/:site_id/:user_id/:portfolio_id/:picture_id",
            get(picture::picture_get),
        )
        .route(
            "/picture/get/:site_id/:user_id/:portfolio_id/:picture_id/",
            get(picture::picture_get),
        )
        .route("/picture/add", post(picture::picture_add))
        .route("/picture/add/", post(picture::picture_add))
        .route("/picture/delete", post(picture::picture_delete))
        .route("/picture/delete/", post(picture::picture_delete))
        .route("/picture/update", post(picture::picture_update))
        .route("/picture/update/", post(picture::picture_update))
        .layer(DefaultBodyLimit::max(config.images.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_layer,
        ));

    let assets = Router::new()
        .nest(&mount_point(&config.images.url_path), image_files(&state))
        .nest(&mount_point(&config.themes.url_path), theme_files(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_active_site,
        ));

    let app = Router::new()
        .route("/health", get(public::health))
        .merge(pages)
        .merge(assets)
        .layer(middleware::from_fn(log_requests));

    let app = match cors_layer(&config.server.cors_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.with_state(state)
}

fn mount_point(url_path: &str) -> String {
    format!("/{}", url_path.trim_matches('/'))
}

/// Images of the main site, never cached by the browser so replaced files show up.
fn image_files(state: &AppState) -> Router<Arc<AppState>> {
    let dir = state
        .config
        .images
        .dir
        .join(format!("site{}", MAIN_SITE_ID));

    Router::new()
        .route_service("/*path", ServeDir::new(dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
}

/// Theme assets, cached for a day.
fn theme_files(state: &AppState) -> Router<Arc<AppState>> {
    Router::new()
        .route_service("/*path", ServeDir::new(&state.config.themes.dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=86400, public"),
        ))
}

/// CORS for the configured origins; `None` when the list is empty.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("⚠️  Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

/// Log method, path, status and latency of every request.
async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handlers::test_support::TestApp;

    #[test]
    fn mount_points_are_rooted() {
        assert_eq!(mount_point("img"), "/img");
        assert_eq!(mount_point("/templates/"), "/templates");
    }

    #[test]
    fn cors_is_off_without_valid_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_none());
        assert!(cors_layer(&["https://example.com".to_string()]).is_some());
    }

    #[tokio::test]
    async fn health_and_trailing_slashes() {
        let mut app = TestApp::new().await;
        let health = app.get("/health").await;
        assert_eq!(health.json["service"], "onepage-cms");

        assert_eq!(app.get("/login").await.status, 200);
        assert_eq!(app.get("/login/").await.status, 200);
        assert_eq!(app.get("/nowhere").await.status, 404);
    }

    #[tokio::test]
    async fn images_are_served_uncached() {
        let mut app = TestApp::new().await;
        let dir = app.state.image_dir(MAIN_SITE_ID).unwrap();
        std::fs::write(dir.join("hello.txt"), b"hi").unwrap();

        let response = app.get("/img/hello.txt").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"hi");
        assert_eq!(
            response.header("cache-control"),
            Some("no-cache, no-store, must-revalidate")
        );
        assert_eq!(response.header("pragma"), Some("no-cache"));
    }

    #[tokio::test]
    async fn theme_assets_are_cached_for_a_day() {
        let mut app = TestApp::new().await;
        let response = app.get("/templates/agency_1_0_2/theme.toml").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.header("cache-control"), Some("max-age=86400, public"));
    }

    #[tokio::test]
    async fn static_files_need_an_active_site() {
        let mut app = TestApp::new().await;
        let dir = app.state.image_dir(MAIN_SITE_ID).unwrap();
        std::fs::write(dir.join("hello.txt"), b"hi").unwrap();

        let mut site = app.state.db.main_site().unwrap().unwrap();
        site.active = false;
        app.state.db.save_site(&mut site).unwrap();

        let image = app.get("/img/hello.txt").await;
        assert_eq!(image.status, 403);
        assert_eq!(image.json["error"], "Inactive site");
        assert_ne!(image.body, b"hi");
        assert_eq!(app.get("/templates/agency_1_0_2/theme.toml").await.status, 403);
    }

    #[tokio::test]
    async fn sessions_are_not_opened_for_health_or_static_files() {
        let mut app = TestApp::new().await;
        let dir = app.state.image_dir(MAIN_SITE_ID).unwrap();
        std::fs::write(dir.join("hello.txt"), b"hi").unwrap();

        assert!(app.get("/health").await.header("set-cookie").is_none());
        assert!(app.get("/img/hello.txt").await.header("set-cookie").is_none());
        assert!(app
            .get("/templates/agency_1_0_2/theme.toml")
            .await
            .header("set-cookie")
            .is_none());
        assert!(app.cookie.is_none());

        app.get("/login/").await;
        assert!(app.cookie.is_some());
    }

    #[tokio::test]
    async fn first_request_sets_the_session_cookie() {
        let mut app = TestApp::new().await;
        app.get("/login/").await;
        let cookie = app.cookie.clone().unwrap();
        assert!(cookie.starts_with("cms_session="));

        let again = app.get("/login/").await;
        assert!(again.header("set-cookie").is_none());
    }
}
