//! Submitted form fields, from either `application/x-www-form-urlencoded` or
//! `multipart/form-data` bodies. A multipart `upload` file field becomes an [`Upload`].

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use std::collections::HashMap;

use super::reply::Rejection;
use crate::processing::Upload;

/// Name of the file field carrying an image.
pub const UPLOAD_FIELD: &str = "upload";

#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    upload: Option<Upload>,
}

impl FormData {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            fields: pairs.into_iter().collect(),
            upload: None,
        }
    }

    pub fn from_urlencoded(body: &[u8]) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(body).map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, Rejection> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
            let name = field.name().unwrap_or("").to_string();

            if name == UPLOAD_FIELD {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(bad_request)?;
                // Browsers send an empty part when no file was chosen
                if !filename.is_empty() && !data.is_empty() {
                    form.upload = Some(Upload {
                        filename,
                        data: data.to_vec(),
                    });
                }
            } else {
                let value = field.text().await.map_err(bad_request)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Field value, or an empty string when absent.
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Field parsed as a record id.
    pub fn id(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn take_upload(&mut self) -> Option<Upload> {
        self.upload.take()
    }
}

fn bad_request(e: impl std::fmt::Display) -> Rejection {
    Rejection::Abort(
        StatusCode::BAD_REQUEST,
        format!("Failed to read form data: {}", e),
    )
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(bad_request)?;
            Self::from_multipart(multipart).await
        } else {
            let body = Bytes::from_request(req, state).await.map_err(bad_request)?;
            Ok(Self::from_urlencoded(&body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn parses_urlencoded_bodies() {
        let form = FormData::from_urlencoded(b"email=a%40b.com&name=Jo%C3%A3o+Neto&site=1");
        assert_eq!(form.get("email"), Some("a@b.com"));
        assert_eq!(form.text("name"), "João Neto");
        assert_eq!(form.id("site"), Some(1));
        assert_eq!(form.id("email"), None);
        assert_eq!(form.text("missing"), "");
    }

    #[tokio::test]
    async fn extracts_multipart_upload() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            Beach\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"beach.jpg\"\r\n\
            Content-Type: image/jpeg\r\n\r\n\
            JPEGDATA\r\n\
            --XyZ--\r\n";
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XyZ")
            .body(Body::from(body))
            .unwrap();

        let mut form = FormData::from_request(req, &()).await.unwrap();
        assert_eq!(form.get("title"), Some("Beach"));
        let upload = form.take_upload().unwrap();
        assert_eq!(upload.filename, "beach.jpg");
        assert_eq!(upload.data, b"JPEGDATA");
    }

    #[tokio::test]
    async fn empty_file_part_is_no_upload() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n\
            \r\n\
            --XyZ--\r\n";
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XyZ")
            .body(Body::from(body))
            .unwrap();

        let mut form = FormData::from_request(req, &()).await.unwrap();
        assert!(form.take_upload().is_none());
    }
}
