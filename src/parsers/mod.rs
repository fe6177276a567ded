pub mod json_scan;
pub mod payload;
pub mod scripts;

pub use json_scan::*;
pub use payload::*;
pub use scripts::*;

use html_escape::decode_html_entities;

/// Clean and normalize text by removing extra whitespace and decoding HTML entities
pub fn clean_text(text: &str) -> String {
    let decoded = decode_html_entities(text);
    decoded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace_and_entities() {
        assert_eq!(clean_text("  Guerlain\n\t&amp; Co "), "Guerlain & Co");
        assert_eq!(clean_text(""), "");
    }
}
