//! Table definitions, applied on every open.

pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT NOT NULL UNIQUE,
    password        TEXT NOT NULL,
    name            TEXT NOT NULL,
    user_hash       TEXT NOT NULL DEFAULT '',
    active          INTEGER NOT NULL DEFAULT 0,
    created_date    TEXT NOT NULL,
    modified_date   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sites (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id             INTEGER NOT NULL REFERENCES users(id),
    site_email          TEXT NOT NULL UNIQUE,
    site_owner          TEXT NOT NULL,
    site_template       TEXT NOT NULL,
    site_title          TEXT NOT NULL,
    site_description    TEXT NOT NULL,
    site_copyright      TEXT NOT NULL,
    page_title          TEXT NOT NULL,
    page_content        TEXT NOT NULL,
    address             TEXT NOT NULL,
    map_url             TEXT NOT NULL,
    phones              TEXT NOT NULL,
    whats_app_phones    TEXT NOT NULL,
    facebook_url        TEXT NOT NULL,
    twitter_url         TEXT NOT NULL,
    active              INTEGER NOT NULL DEFAULT 0,
    created_date        TEXT NOT NULL,
    modified_date       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS portfolios (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id             INTEGER NOT NULL REFERENCES sites(id),
    title               TEXT NOT NULL,
    description         TEXT NOT NULL,
    original_image      TEXT NOT NULL UNIQUE,
    normalized_image    TEXT NOT NULL UNIQUE,
    thumbnail_image     TEXT NOT NULL UNIQUE,
    active              INTEGER NOT NULL DEFAULT 0,
    created_date        TEXT NOT NULL,
    modified_date       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pictures (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id             INTEGER NOT NULL REFERENCES sites(id),
    portfolio_id        INTEGER NOT NULL REFERENCES portfolios(id),
    title               TEXT NOT NULL,
    description         TEXT NOT NULL,
    original_image      TEXT NOT NULL UNIQUE,
    normalized_image    TEXT NOT NULL UNIQUE,
    thumbnail_image     TEXT NOT NULL UNIQUE,
    active              INTEGER NOT NULL DEFAULT 0,
    created_date        TEXT NOT NULL,
    modified_date       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_picture_portfolio ON pictures(portfolio_id);
";
