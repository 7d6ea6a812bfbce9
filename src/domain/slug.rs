use std::str::FromStr;

use regex::Regex;

use serde::{Deserialize, Deserializer, Serialize};

const MAX_LEN: usize = 128;

/// URL-safe identifier for blog posts and categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a free-form title
    pub fn from_title(title: &str) -> Result<Self, String> {
        lazy_static::lazy_static! {
            static ref SEPARATORS: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
        }

        let lowered = title.to_lowercase();
        let slug = SEPARATORS.replace_all(&lowered, "-");
        slug.trim_matches('-').parse()
    }
}

impl FromStr for Slug {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap();
        }

        if value.is_empty() {
            return Err("Slug cannot be empty".into());
        }
        if value.len() > MAX_LEN {
            return Err("Slug too long".into());
        }
        if !SLUG_REGEX.is_match(value) {
            return Err("Slug may only contain lowercase letters, digits and dashes".into());
        }
        Ok(Self(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
