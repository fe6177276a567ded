use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    Sephora,
    LevelShoes,
    Other,
}

impl Site {
    pub fn key(&self) -> &'static str {
        match self {
            Site::Sephora => "sephora",
            Site::LevelShoes => "levelshoes",
            Site::Other => "plp",
        }
    }

    /// Guess the site from a URL, a file name or page text.
    pub fn detect(haystack: &str) -> Self {
        let lower = haystack.to_lowercase();
        if lower.contains("sephora") {
            Site::Sephora
        } else if lower.contains("levelshoes") || lower.contains("level shoes") {
            Site::LevelShoes
        } else {
            Site::Other
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Sephora => write!(f, "Sephora"),
            Site::LevelShoes => write!(f, "Level Shoes"),
            Site::Other => write!(f, "product listing page"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_site_from_url_and_text() {
        assert_eq!(Site::detect("https://www.sephora.com.tr/makyaj"), Site::Sephora);
        assert_eq!(Site::detect("<title>Designers | Level Shoes</title>"), Site::LevelShoes);
        assert_eq!(Site::detect("https://example.com"), Site::Other);
    }
}
