//! # HTTP Handlers
//!
//! One module per area of the site. Every handler starts by running its guard chain
//! (see [`guards`](super::guards)) and answers with a [`Reply`](super::reply::Reply).
//!
//! Admin pages answer with the JSON context a page template would receive, including
//! the CSRF token its forms must send back.

pub mod login;
pub mod picture;
pub mod portfolio;
pub mod public;
pub mod site;
pub mod user;

use serde::Serialize;

use crate::store::{ImageNames, ImageUrls};

/// A record together with the public URLs of its images.
#[derive(Debug, Serialize)]
pub struct WithUrls<'a, T> {
    #[serde(flatten)]
    pub item: &'a T,
    #[serde(flatten)]
    pub urls: ImageUrls,
}

pub(crate) fn with_urls<'a, T>(
    item: &'a T,
    images: &ImageNames,
    img_url: &str,
) -> WithUrls<'a, T> {
    WithUrls {
        item,
        urls: images.urls(img_url),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! The application served on an ephemeral port, with an in-memory database, a
    //! temporary image folder and a recording mailer. Requests are raw HTTP/1.1.

    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use crate::common::config::CmsConfig;
    use crate::mail::tests::RecordingMailer;
    use crate::processing::backend::tests::small_sizes;
    use crate::processing::JpegBackend;
    use crate::server::router::build_router;
    use crate::server::themes::ThemeRegistry;
    use crate::server::AppState;
    use crate::store::Database;

    pub(crate) struct TestApp {
        pub(crate) state: Arc<AppState>,
        pub(crate) mailer: Arc<RecordingMailer>,
        pub(crate) cookie: Option<String>,
        addr: std::net::SocketAddr,
        _images: TempDir,
    }

    #[derive(Debug)]
    pub(crate) struct TestResponse {
        pub(crate) status: u16,
        pub(crate) headers: Vec<(String, String)>,
        pub(crate) body: Vec<u8>,
        pub(crate) json: Value,
    }

    impl TestResponse {
        pub(crate) fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    impl TestApp {
        pub(crate) async fn new() -> Self {
            let images = tempfile::tempdir().unwrap();
            let mut config = CmsConfig::default();
            config.images.dir = images.path().to_path_buf();
            let sizes = small_sizes();
            config.images.original = sizes.original;
            config.images.normalized = sizes.normalized;
            config.images.thumbnail = sizes.thumbnail;

            let db = Database::open_in_memory().unwrap();
            db.bootstrap(&config.bootstrap).unwrap();

            let mailer = Arc::new(RecordingMailer::default());
            let state = Arc::new(AppState::new(
                config,
                Arc::new(db),
                mailer.clone(),
                Arc::new(JpegBackend::new(90)),
                ThemeRegistry::default(),
            ));
            let router = build_router(state.clone());

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });

            Self {
                state,
                mailer,
                cookie: None,
                addr,
                _images: images,
            }
        }

        async fn send(
            &mut self,
            method: &str,
            uri: &str,
            content_type: Option<&str>,
            body: &[u8],
        ) -> TestResponse {
            let mut head = format!(
                "{} {} HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\nContent-Length: {}\r\n",
                method,
                uri,
                body.len()
            );
            if let Some(content_type) = content_type {
                head.push_str(&format!("Content-Type: {}\r\n", content_type));
            }
            if let Some(cookie) = &self.cookie {
                head.push_str(&format!("Cookie: {}\r\n", cookie));
            }
            head.push_str("\r\n");

            let mut stream = TcpStream::connect(self.addr).await.unwrap();
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(body).await.unwrap();
            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await.unwrap();

            let split = raw
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .expect("response head");
            let head = String::from_utf8_lossy(&raw[..split]).to_string();
            let body = raw[split + 4..].to_vec();

            let mut lines = head.lines();
            let status = lines
                .next()
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|code| code.parse().ok())
                .expect("status line");
            let headers: Vec<(String, String)> = lines
                .filter_map(|line| line.split_once(':'))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect();

            let response = TestResponse {
                status,
                json: serde_json::from_slice(&body).unwrap_or(Value::Null),
                headers,
                body,
            };
            if let Some(set_cookie) = response.header("set-cookie") {
                self.cookie = set_cookie.split(';').next().map(str::to_string);
            }
            response
        }

        pub(crate) async fn get(&mut self, uri: &str) -> TestResponse {
            self.send("GET", uri, None, b"").await
        }

        pub(crate) async fn post(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish();
            self.send(
                "POST",
                uri,
                Some("application/x-www-form-urlencoded"),
                body.as_bytes(),
            )
            .await
        }

        /// Multipart POST with an optional `upload` file.
        pub(crate) async fn post_multipart(
            &mut self,
            uri: &str,
            fields: &[(&str, &str)],
            upload: Option<(&str, &[u8])>,
        ) -> TestResponse {
            let boundary = "cmsTestBoundary";
            let mut body = Vec::new();
            for (name, value) in fields {
                body.extend_from_slice(
                    format!(
                        "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        boundary, name, value
                    )
                    .as_bytes(),
                );
            }
            if let Some((filename, data)) = upload {
                body.extend_from_slice(
                    format!(
                        "--{}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"{}\"\r\nContent-Type: image/jpeg\r\n\r\n",
                        boundary, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
            body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

            let content_type = format!("multipart/form-data; boundary={}", boundary);
            self.send("POST", uri, Some(&content_type), &body).await
        }

        /// Fetch a page to obtain its CSRF token.
        pub(crate) async fn csrf(&mut self, page: &str) -> String {
            let response = self.get(page).await;
            response.json["csrf"]
                .as_str()
                .unwrap_or_else(|| panic!("no csrf on {}: {:?}", page, response))
                .to_string()
        }

        /// Log in as the bootstrap owner.
        pub(crate) async fn login(&mut self) {
            let csrf = self.csrf("/login/").await;
            let response = self
                .post(
                    "/login/",
                    &[
                        ("csrf", &csrf),
                        ("email", "admin@localhost.com"),
                        ("password", "1234"),
                        ("redirect_url", "/site/admin/"),
                    ],
                )
                .await;
            assert_eq!(response.json["status"], true, "{}", response.json);
        }
    }
}
