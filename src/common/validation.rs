//! Regex predicates for fields typed in by site owners and visitors.
//!
//! Every pattern is anchored at both ends and compiled once.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\da-z])([a-z0-9_.-]+)@([\da-z])([\da-z.-]+)\.([a-z]{2,6})$").unwrap()
});

static PHONE_NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\([1-9]{2}\)[0-9]{4,5}-[0-9]{4},?)+$").unwrap());

static MAP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://([\da-z])([\da-z.-]+)\.([a-z]{2,6})(/[a-zA-Z0-9_./?%&=]*)+$").unwrap()
});

static FACEBOOK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(www|[a-zA-Z]{2}-[a-zA-Z]{2})\.facebook\.com/(pages/[a-zA-Z0-9_.-]+/[0-9]+|[a-zA-Z0-9.-]+)/?$",
    )
    .unwrap()
});

static TWITTER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://twitter\.com/(#!/)?[a-zA-Z0-9_]{1,15}/?$").unwrap());

pub fn email(s: &str) -> bool {
    EMAIL.is_match(s)
}

/// Comma separated list of `(DD)NNNN-NNNN` or `(DD)NNNNN-NNNN` numbers.
pub fn phone_numbers(s: &str) -> bool {
    PHONE_NUMBERS.is_match(s)
}

/// Host names may contain dashes, the path after them may not.
pub fn map_url(s: &str) -> bool {
    MAP_URL.is_match(s)
}

pub fn facebook_url(s: &str) -> bool {
    FACEBOOK_URL.is_match(s)
}

pub fn twitter_url(s: &str) -> bool {
    TWITTER_URL.is_match(s)
}
