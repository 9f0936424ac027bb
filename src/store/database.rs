//! # SQLite Store
//!
//! [`Database`] owns one `rusqlite` connection behind a mutex. Single-row lookups are
//! short and run inline; list queries and multi-statement deletes go through
//! [`run_blocking`] so they never hold an async worker thread.
//!
//! ## Conventions
//!
//! - Lookups return `Ok(None)` when the row does not exist
//! - `save_*` methods validate the record and refresh `modified_date`
//! - Unique-constraint violations surface as [`CmsError::Validation`]

use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::models::*;
use super::password::{hash_password, sha256_hex};
use super::schema::SCHEMA;
use crate::common::config::BootstrapConfig;
use crate::common::{CmsError, Result};

/// The single site this installation publishes.
pub const MAIN_SITE_ID: i64 = 1;

const USER_COLUMNS: &str =
    "id, email, password, name, user_hash, active, created_date, modified_date";

const SITE_COLUMNS: &str = "id, user_id, site_email, site_owner, site_template, site_title, \
     site_description, site_copyright, page_title, page_content, address, map_url, phones, \
     whats_app_phones, facebook_url, twitter_url, active, created_date, modified_date";

const PORTFOLIO_COLUMNS: &str = "id, site_id, title, description, original_image, \
     normalized_image, thumbnail_image, active, created_date, modified_date";

const PICTURE_COLUMNS: &str = "id, site_id, portfolio_id, title, description, original_image, \
     normalized_image, thumbnail_image, active, created_date, modified_date";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("🗄️  Opened database {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied statement behind.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // BOOTSTRAP
    // ========================================================================

    /// Make sure the main user and its site exist, creating both in one transaction.
    pub fn bootstrap(&self, main: &BootstrapConfig) -> Result<(User, Site)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let user = match query_user(&tx, "email = ?1", params![main.email])? {
            Some(user) => user,
            None => {
                info!("👤 Creating main user {}", main.email);
                insert_user_row(
                    &tx,
                    &NewUser {
                        email: main.email.clone(),
                        password: hash_password(&main.password),
                        name: main.name.clone(),
                        active: true,
                    },
                )?
            }
        };

        let site = match query_site(&tx, "user_id = ?1", params![user.id])? {
            Some(site) => site,
            None => {
                info!("🌐 Creating main site for {}", user.email);
                insert_site_row(&tx, user.id, &SiteContent::with_email(&main.email), true)?
            }
        };

        tx.commit()?;

        if site.id != MAIN_SITE_ID {
            warn!(
                "Main site has id {} but requests are served for site {}",
                site.id, MAIN_SITE_ID
            );
        }
        Ok((user, site))
    }

    // ========================================================================
    // USERS
    // ========================================================================

    pub fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        query_user(&self.conn(), "id = ?1", params![id])
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        query_user(&self.conn(), "email = ?1", params![email])
    }

    /// User addressed by a recovery link.
    pub fn user_by_recovery(&self, id: i64, user_hash: &str) -> Result<Option<User>> {
        query_user(
            &self.conn(),
            "id = ?1 AND user_hash = ?2",
            params![id, user_hash],
        )
    }

    pub fn insert_user(&self, new: &NewUser) -> Result<User> {
        insert_user_row(&self.conn(), new)
    }

    /// Persist a user. The recovery hash is regenerated, so any outstanding recovery
    /// link stops working once the user changes.
    pub fn save_user(&self, user: &mut User) -> Result<()> {
        user.validate()?;
        user.modified_date = now_stamp();
        user.user_hash = recovery_hash(&user.email, &user.modified_date);
        self.conn()
            .execute(
                "UPDATE users SET email = ?1, password = ?2, name = ?3, user_hash = ?4, \
                 active = ?5, modified_date = ?6 WHERE id = ?7",
                params![
                    user.email,
                    user.password,
                    user.name,
                    user.user_hash,
                    user.active,
                    user.modified_date,
                    user.id
                ],
            )
            .map_err(|e| unique_violation(e, "Email already registered"))?;
        Ok(())
    }

    // ========================================================================
    // SITES
    // ========================================================================

    pub fn site_by_id(&self, id: i64) -> Result<Option<Site>> {
        query_site(&self.conn(), "id = ?1", params![id])
    }

    pub fn site_by_user(&self, user_id: i64) -> Result<Option<Site>> {
        query_site(&self.conn(), "user_id = ?1", params![user_id])
    }

    pub fn main_site(&self) -> Result<Option<Site>> {
        self.site_by_id(MAIN_SITE_ID)
    }

    pub fn insert_site(&self, user_id: i64, content: &SiteContent, active: bool) -> Result<Site> {
        content.validate()?;
        insert_site_row(&self.conn(), user_id, content, active)
    }

    pub fn save_site(&self, site: &mut Site) -> Result<()> {
        site.content.validate()?;
        site.modified_date = now_stamp();
        let c = &site.content;
        self.conn()
            .execute(
                "UPDATE sites SET site_email = ?1, site_owner = ?2, site_template = ?3, \
                 site_title = ?4, site_description = ?5, site_copyright = ?6, page_title = ?7, \
                 page_content = ?8, address = ?9, map_url = ?10, phones = ?11, \
                 whats_app_phones = ?12, facebook_url = ?13, twitter_url = ?14, active = ?15, \
                 modified_date = ?16 WHERE id = ?17",
                params![
                    c.site_email,
                    c.site_owner,
                    c.site_template,
                    c.site_title,
                    c.site_description,
                    c.site_copyright,
                    c.page_title,
                    c.page_content,
                    c.address,
                    c.map_url,
                    c.phones,
                    c.whats_app_phones,
                    c.facebook_url,
                    c.twitter_url,
                    site.active,
                    site.modified_date,
                    site.id
                ],
            )
            .map_err(|e| unique_violation(e, "Site email already registered"))?;
        Ok(())
    }

    // ========================================================================
    // PORTFOLIOS
    // ========================================================================

    pub fn portfolios(&self, site_id: i64) -> Result<Vec<Portfolio>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM portfolios WHERE site_id = ?1 ORDER BY id",
            PORTFOLIO_COLUMNS
        ))?;
        let rows = stmt.query_map(params![site_id], portfolio_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn portfolio(&self, site_id: i64, portfolio_id: i64) -> Result<Option<Portfolio>> {
        let conn = self.conn();
        let portfolio = conn
            .query_row(
                &format!(
                    "SELECT {} FROM portfolios WHERE id = ?1 AND site_id = ?2",
                    PORTFOLIO_COLUMNS
                ),
                params![portfolio_id, site_id],
                portfolio_from_row,
            )
            .optional()?;
        Ok(portfolio)
    }

    /// Highest portfolio id of a site, used to pick the next image slot.
    pub fn last_portfolio_id(&self, site_id: i64) -> Result<Option<i64>> {
        let id = self.conn().query_row(
            "SELECT MAX(id) FROM portfolios WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn insert_portfolio(&self, site_id: i64, new: &NewEntry) -> Result<Portfolio> {
        let conn = self.conn();
        let now = now_stamp();
        conn.execute(
            "INSERT INTO portfolios (site_id, title, description, original_image, \
             normalized_image, thumbnail_image, active, created_date, modified_date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
            params![
                site_id,
                new.title,
                new.description,
                new.images.original_image,
                new.images.normalized_image,
                new.images.thumbnail_image,
                now
            ],
        )
        .map_err(|e| unique_violation(e, "Image already registered"))?;
        Ok(Portfolio {
            id: conn.last_insert_rowid(),
            site: site_id,
            title: new.title.clone(),
            description: new.description.clone(),
            images: new.images.clone(),
            active: false,
            created_date: now.clone(),
            modified_date: now,
        })
    }

    pub fn save_portfolio(&self, portfolio: &mut Portfolio) -> Result<()> {
        portfolio.modified_date = now_stamp();
        self.conn().execute(
            "UPDATE portfolios SET title = ?1, description = ?2, original_image = ?3, \
             normalized_image = ?4, thumbnail_image = ?5, active = ?6, modified_date = ?7 \
             WHERE id = ?8",
            params![
                portfolio.title,
                portfolio.description,
                portfolio.images.original_image,
                portfolio.images.normalized_image,
                portfolio.images.thumbnail_image,
                portfolio.active,
                portfolio.modified_date,
                portfolio.id
            ],
        )?;
        Ok(())
    }

    /// Delete a portfolio row together with the rows of its pictures.
    pub fn delete_portfolio(&self, portfolio_id: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM pictures WHERE portfolio_id = ?1",
            params![portfolio_id],
        )?;
        tx.execute("DELETE FROM portfolios WHERE id = ?1", params![portfolio_id])?;
        tx.commit()?;
        Ok(())
    }

    // ========================================================================
    // PICTURES
    // ========================================================================

    pub fn pictures(&self, site_id: i64, portfolio_id: i64) -> Result<Vec<Picture>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pictures WHERE site_id = ?1 AND portfolio_id = ?2 ORDER BY id",
            PICTURE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![site_id, portfolio_id], picture_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn picture(
        &self,
        site_id: i64,
        portfolio_id: i64,
        picture_id: i64,
    ) -> Result<Option<Picture>> {
        let conn = self.conn();
        let picture = conn
            .query_row(
                &format!(
                    "SELECT {} FROM pictures WHERE id = ?1 AND site_id = ?2 AND portfolio_id = ?3",
                    PICTURE_COLUMNS
                ),
                params![picture_id, site_id, portfolio_id],
                picture_from_row,
            )
            .optional()?;
        Ok(picture)
    }

    /// Highest picture id of a site, used to pick the next image slot.
    pub fn last_picture_id(&self, site_id: i64) -> Result<Option<i64>> {
        let id = self.conn().query_row(
            "SELECT MAX(id) FROM pictures WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn insert_picture(
        &self,
        site_id: i64,
        portfolio_id: i64,
        new: &NewEntry,
    ) -> Result<Picture> {
        let conn = self.conn();
        let now = now_stamp();
        conn.execute(
            "INSERT INTO pictures (site_id, portfolio_id, title, description, original_image, \
             normalized_image, thumbnail_image, active, created_date, modified_date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                site_id,
                portfolio_id,
                new.title,
                new.description,
                new.images.original_image,
                new.images.normalized_image,
                new.images.thumbnail_image,
                now
            ],
        )
        .map_err(|e| unique_violation(e, "Image already registered"))?;
        Ok(Picture {
            id: conn.last_insert_rowid(),
            site: site_id,
            portfolio: portfolio_id,
            title: new.title.clone(),
            description: new.description.clone(),
            images: new.images.clone(),
            active: false,
            created_date: now.clone(),
            modified_date: now,
        })
    }

    pub fn save_picture(&self, picture: &mut Picture) -> Result<()> {
        picture.modified_date = now_stamp();
        self.conn().execute(
            "UPDATE pictures SET title = ?1, description = ?2, original_image = ?3, \
             normalized_image = ?4, thumbnail_image = ?5, active = ?6, modified_date = ?7 \
             WHERE id = ?8",
            params![
                picture.title,
                picture.description,
                picture.images.original_image,
                picture.images.normalized_image,
                picture.images.thumbnail_image,
                picture.active,
                picture.modified_date,
                picture.id
            ],
        )?;
        Ok(())
    }

    pub fn delete_picture(&self, picture_id: i64) -> Result<()> {
        self.conn()
            .execute("DELETE FROM pictures WHERE id = ?1", params![picture_id])?;
        Ok(())
    }
}

// ============================================================================
// ROW HELPERS - shared by plain connections and transactions
// ============================================================================

fn query_user(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, filter),
            params,
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

fn query_site(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Site>> {
    let site = conn
        .query_row(
            &format!(
                "SELECT {} FROM sites WHERE {} ORDER BY id LIMIT 1",
                SITE_COLUMNS, filter
            ),
            params,
            site_from_row,
        )
        .optional()?;
    Ok(site)
}

fn insert_user_row(conn: &Connection, new: &NewUser) -> Result<User> {
    let now = now_stamp();
    let mut user = User {
        id: 0,
        email: new.email.clone(),
        password: new.password.clone(),
        name: new.name.clone(),
        user_hash: String::new(),
        active: new.active,
        created_date: now.clone(),
        modified_date: now,
    };
    user.validate()?;
    user.user_hash = recovery_hash(&user.email, &user.modified_date);
    conn.execute(
        "INSERT INTO users (email, password, name, user_hash, active, created_date, modified_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.email,
            user.password,
            user.name,
            user.user_hash,
            user.active,
            user.created_date,
            user.modified_date
        ],
    )
    .map_err(|e| unique_violation(e, "Email already registered"))?;
    user.id = conn.last_insert_rowid();
    Ok(user)
}

fn insert_site_row(
    conn: &Connection,
    user_id: i64,
    content: &SiteContent,
    active: bool,
) -> Result<Site> {
    let now = now_stamp();
    let c = content;
    conn.execute(
        "INSERT INTO sites (user_id, site_email, site_owner, site_template, site_title, \
         site_description, site_copyright, page_title, page_content, address, map_url, phones, \
         whats_app_phones, facebook_url, twitter_url, active, created_date, modified_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
        params![
            user_id,
            c.site_email,
            c.site_owner,
            c.site_template,
            c.site_title,
            c.site_description,
            c.site_copyright,
            c.page_title,
            c.page_content,
            c.address,
            c.map_url,
            c.phones,
            c.whats_app_phones,
            c.facebook_url,
            c.twitter_url,
            active,
            now
        ],
    )
    .map_err(|e| unique_violation(e, "Site email already registered"))?;
    Ok(Site {
        id: conn.last_insert_rowid(),
        user: user_id,
        content: content.clone(),
        active,
        created_date: now.clone(),
        modified_date: now,
    })
}

fn recovery_hash(email: &str, stamp: &str) -> String {
    sha256_hex(format!("{}{}", email, stamp).as_bytes())
}

fn unique_violation(err: rusqlite::Error, msg: &str) -> CmsError {
    let is_constraint = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    );
    if is_constraint {
        CmsError::Validation(msg.to_string())
    } else {
        CmsError::Database(err)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        password: row.get("password")?,
        name: row.get("name")?,
        user_hash: row.get("user_hash")?,
        active: row.get("active")?,
        created_date: row.get("created_date")?,
        modified_date: row.get("modified_date")?,
    })
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get("id")?,
        user: row.get("user_id")?,
        content: SiteContent {
            site_email: row.get("site_email")?,
            site_owner: row.get("site_owner")?,
            site_template: row.get("site_template")?,
            site_title: row.get("site_title")?,
            site_description: row.get("site_description")?,
            site_copyright: row.get("site_copyright")?,
            page_title: row.get("page_title")?,
            page_content: row.get("page_content")?,
            address: row.get("address")?,
            map_url: row.get("map_url")?,
            phones: row.get("phones")?,
            whats_app_phones: row.get("whats_app_phones")?,
            facebook_url: row.get("facebook_url")?,
            twitter_url: row.get("twitter_url")?,
        },
        active: row.get("active")?,
        created_date: row.get("created_date")?,
        modified_date: row.get("modified_date")?,
    })
}

fn image_names_from_row(row: &Row<'_>) -> rusqlite::Result<ImageNames> {
    Ok(ImageNames {
        original_image: row.get("original_image")?,
        normalized_image: row.get("normalized_image")?,
        thumbnail_image: row.get("thumbnail_image")?,
    })
}

/// Run `f` against the database on tokio's blocking pool.
///
/// # Example
/// ```ignore
/// let portfolios = run_blocking(state.db.clone(), move |db| db.portfolios(site_id)).await?;
/// ```
pub async fn run_blocking<T, F>(db: Arc<Database>, f: F) -> Result<T>
where
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| CmsError::Io(std::io::Error::other(format!("Database task panicked: {}", e))))?
}

fn portfolio_from_row(row: &Row<'_>) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        id: row.get("id")?,
        site: row.get("site_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        images: image_names_from_row(row)?,
        active: row.get("active")?,
        created_date: row.get("created_date")?,
        modified_date: row.get("modified_date")?,
    })
}

fn picture_from_row(row: &Row<'_>) -> rusqlite::Result<Picture> {
    Ok(Picture {
        id: row.get("id")?,
        site: row.get("site_id")?,
        portfolio: row.get("portfolio_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        images: image_names_from_row(row)?,
        active: row.get("active")?,
        created_date: row.get("created_date")?,
        modified_date: row.get("modified_date")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::verify_password;

    fn bootstrapped() -> (Database, User, Site) {
        let db = Database::open_in_memory().unwrap();
        let (user, site) = db.bootstrap(&BootstrapConfig::default()).unwrap();
        (db, user, site)
    }

    fn entry(prefix: &str, index: i64) -> NewEntry {
        NewEntry {
            title: format!("{} {}", prefix, index),
            description: "desc".to_string(),
            images: ImageNames::for_index(prefix, index),
        }
    }

    #[test]
    fn bootstrap_creates_active_main_site_once() {
        let (db, user, site) = bootstrapped();
        assert_eq!(site.id, MAIN_SITE_ID);
        assert_eq!(site.user, user.id);
        assert!(site.active && user.active);
        assert!(verify_password("1234", &user.password));

        let (again_user, again_site) = db.bootstrap(&BootstrapConfig::default()).unwrap();
        assert_eq!(again_user.id, user.id);
        assert_eq!(again_site.id, site.id);
        assert_eq!(db.main_site().unwrap().unwrap(), site);
    }

    #[test]
    fn saving_user_rotates_recovery_hash() {
        let (db, mut user, _) = bootstrapped();
        let old_hash = user.user_hash.clone();
        user.user_hash = "stale".to_string();
        user.name = "Jane Smith".to_string();
        db.save_user(&mut user).unwrap();

        assert!(db.user_by_recovery(user.id, "stale").unwrap().is_none());
        let found = db.user_by_recovery(user.id, &user.user_hash).unwrap().unwrap();
        assert_eq!(found.name, "Jane Smith");
        assert_eq!(old_hash.len(), 64);
    }

    #[test]
    fn duplicate_email_is_a_validation_error() {
        let (db, _, _) = bootstrapped();
        let other = db
            .insert_user(&NewUser {
                email: "other@localhost.com".to_string(),
                password: hash_password("x"),
                name: "Other".to_string(),
                active: true,
            })
            .unwrap();

        let mut other = db.user_by_id(other.id).unwrap().unwrap();
        other.email = "admin@localhost.com".to_string();
        let err = db.save_user(&mut other).unwrap_err();
        assert!(matches!(err, CmsError::Validation(ref m) if m == "Email already registered"));
    }

    #[test]
    fn invalid_site_content_is_not_saved() {
        let (db, _, mut site) = bootstrapped();
        site.content.facebook_url = "https://example.com/me".to_string();
        assert!(matches!(
            db.save_site(&mut site),
            Err(CmsError::Validation(_))
        ));
        let stored = db.main_site().unwrap().unwrap();
        assert_eq!(stored.content.facebook_url, "https://www.facebook.com/facebook");
    }

    #[test]
    fn site_update_round_trips() {
        let (db, _, mut site) = bootstrapped();
        site.content.site_title = "Bakery".to_string();
        site.content.phones = "(47)99999-0000".to_string();
        db.save_site(&mut site).unwrap();

        let stored = db.site_by_user(site.user).unwrap().unwrap();
        assert_eq!(stored.content.site_title, "Bakery");
        assert_eq!(stored.content.phones, "(47)99999-0000");
    }

    #[test]
    fn portfolio_and_picture_lifecycle() {
        let (db, _, site) = bootstrapped();
        assert_eq!(db.last_portfolio_id(site.id).unwrap(), None);

        let portfolio = db.insert_portfolio(site.id, &entry("portfolio", 1)).unwrap();
        assert_eq!(db.last_portfolio_id(site.id).unwrap(), Some(portfolio.id));

        let first = db
            .insert_picture(site.id, portfolio.id, &entry("picture", 1))
            .unwrap();
        db.insert_picture(site.id, portfolio.id, &entry("picture", 2))
            .unwrap();
        assert_eq!(db.pictures(site.id, portfolio.id).unwrap().len(), 2);

        let mut found = db.picture(site.id, portfolio.id, first.id).unwrap().unwrap();
        found.title = "Renamed".to_string();
        db.save_picture(&mut found).unwrap();
        assert_eq!(
            db.picture(site.id, portfolio.id, first.id).unwrap().unwrap().title,
            "Renamed"
        );

        // Picture lookups are scoped to their portfolio
        assert!(db.picture(site.id, portfolio.id + 1, first.id).unwrap().is_none());

        db.delete_portfolio(portfolio.id).unwrap();
        assert!(db.portfolio(site.id, portfolio.id).unwrap().is_none());
        assert!(db.pictures(site.id, portfolio.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocking_calls_see_the_shared_connection() {
        let (db, _, site) = bootstrapped();
        let db = Arc::new(db);
        db.insert_portfolio(site.id, &entry("portfolio", 1)).unwrap();

        let site_id = site.id;
        let listed = run_blocking(db.clone(), move |db| db.portfolios(site_id))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let id = listed[0].id;
        run_blocking(db.clone(), move |db| db.delete_portfolio(id))
            .await
            .unwrap();
        assert!(db.portfolios(site.id).unwrap().is_empty());
    }

    #[test]
    fn image_names_are_unique() {
        let (db, _, site) = bootstrapped();
        db.insert_portfolio(site.id, &entry("portfolio", 1)).unwrap();
        let err = db
            .insert_portfolio(site.id, &entry("portfolio", 1))
            .unwrap_err();
        assert!(matches!(err, CmsError::Validation(_)));
    }
}
