//! # Records
//!
//! Plain data for the four tables. Field names follow the column names and the JSON
//! keys the admin pages consume, so a record serializes straight into a reply.

use chrono::{Datelike, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::common::validation;
use crate::common::{CmsError, Result};

/// Timestamp format stored in `created_date` / `modified_date`.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub fn now_stamp() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub user_hash: String,
    pub active: bool,
    pub created_date: String,
    pub modified_date: String,
}

impl User {
    pub fn validate(&self) -> Result<()> {
        if !validation::email(&self.email) {
            return Err(CmsError::Validation("Invalid email".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    /// Already hashed with [`hash_password`](super::hash_password)
    pub password: String,
    pub name: String,
    pub active: bool,
}

/// Text shown on the public page, editable from the site admin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteContent {
    pub site_email: String,
    pub site_owner: String,
    pub site_template: String,
    pub site_title: String,
    pub site_description: String,
    pub site_copyright: String,
    pub page_title: String,
    pub page_content: String,
    pub address: String,
    pub map_url: String,
    pub phones: String,
    pub whats_app_phones: String,
    pub facebook_url: String,
    pub twitter_url: String,
}

impl SiteContent {
    /// Content of a freshly created site.
    pub fn with_email(site_email: &str) -> Self {
        Self {
            site_email: site_email.to_string(),
            site_owner: "My New Company".to_string(),
            site_template: "agency".to_string(),
            site_title: "My New Site".to_string(),
            site_description: "A Site Where Everything Is New.<br>We Love Innovation!".to_string(),
            site_copyright: format!("Copyright © My New Site {}", Local::now().year()),
            page_title: "About This New Site".to_string(),
            page_content: "A Site Built By People Who Love New Things.<br>Do You Love New Things?<br/>Then This Is Your Place!".to_string(),
            address: "2015 Innovators Street, Downtown<br>Springfield, 89250-000".to_string(),
            map_url: "https://goo.gl/maps/Fxpy9".to_string(),
            phones: "(12)1234-1234,".to_string(),
            whats_app_phones: "(12)1234-1234,".to_string(),
            facebook_url: "https://www.facebook.com/facebook".to_string(),
            twitter_url: "https://twitter.com/twitter".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &str); 6] = [
            (validation::email(&self.site_email), "Invalid email"),
            (validation::map_url(&self.map_url), "Invalid address URL"),
            (validation::phone_numbers(&self.phones), "Invalid phone numbers"),
            (
                validation::phone_numbers(&self.whats_app_phones),
                "Invalid WhatsApp phone numbers",
            ),
            (validation::facebook_url(&self.facebook_url), "Invalid Facebook URL"),
            (validation::twitter_url(&self.twitter_url), "Invalid Twitter URL"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(CmsError::Validation(msg.to_string())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    pub id: i64,
    /// Owner id
    pub user: i64,
    #[serde(flatten)]
    pub content: SiteContent,
    pub active: bool,
    pub created_date: String,
    pub modified_date: String,
}

/// Filenames of the three stored resolutions of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageNames {
    pub original_image: String,
    pub normalized_image: String,
    pub thumbnail_image: String,
}

impl ImageNames {
    /// Names for slot `index` of `prefix`: `portfolio3.jpg`, `portfolio3_norm.jpg`,
    /// `portfolio3_thumb.jpg`.
    pub fn for_index(prefix: &str, index: i64) -> Self {
        Self {
            original_image: format!("{}{}.jpg", prefix, index),
            normalized_image: format!("{}{}_norm.jpg", prefix, index),
            thumbnail_image: format!("{}{}_thumb.jpg", prefix, index),
        }
    }

    pub fn paths(&self, dir: &Path) -> [PathBuf; 3] {
        [
            dir.join(&self.original_image),
            dir.join(&self.normalized_image),
            dir.join(&self.thumbnail_image),
        ]
    }

    pub fn urls(&self, img_url: &str) -> ImageUrls {
        ImageUrls {
            original: format!("{}{}", img_url, self.original_image),
            normalized: format!("{}{}", img_url, self.normalized_image),
            thumbnail: format!("{}{}", img_url, self.thumbnail_image),
        }
    }
}

/// Public URLs of the three resolutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrls {
    pub original: String,
    pub normalized: String,
    pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub id: i64,
    pub site: i64,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub images: ImageNames,
    pub active: bool,
    pub created_date: String,
    pub modified_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Picture {
    pub id: i64,
    pub site: i64,
    pub portfolio: i64,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub images: ImageNames,
    pub active: bool,
    pub created_date: String,
    pub modified_date: String,
}

/// Fields supplied when creating a portfolio or a picture.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub description: String,
    pub images: ImageNames,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_site_content_is_valid() {
        SiteContent::with_email("admin@localhost.com").validate().unwrap();
    }

    #[test]
    fn site_validation_reports_first_bad_field() {
        let mut content = SiteContent::with_email("admin@localhost.com");
        content.phones = "12345".to_string();
        content.twitter_url = "nope".to_string();

        let err = content.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid phone numbers");
    }

    #[test]
    fn image_names_and_urls() {
        let names = ImageNames::for_index("picture", 7);
        assert_eq!(names.original_image, "picture7.jpg");
        assert_eq!(names.normalized_image, "picture7_norm.jpg");
        assert_eq!(names.thumbnail_image, "picture7_thumb.jpg");

        let urls = names.urls("http://example.com/img/");
        assert_eq!(urls.thumbnail, "http://example.com/img/picture7_thumb.jpg");
    }

    #[test]
    fn secrets_are_not_serialized() {
        let user = User {
            id: 1,
            email: "admin@localhost.com".to_string(),
            password: "sha256$00$11".to_string(),
            name: "Admin".to_string(),
            user_hash: "abc".to_string(),
            active: true,
            created_date: now_stamp(),
            modified_date: now_stamp(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("user_hash").is_none());
        assert_eq!(json["email"], "admin@localhost.com");
    }
}
