pub mod brand;
pub mod diagnostic;
pub mod document;
pub mod site;

pub use brand::*;
pub use diagnostic::*;
pub use document::*;
pub use site::*;

// Field names seen on facet entry objects
pub const LABEL_KEYS: &[&str] = &["label", "name"];
pub const COUNT_KEYS: &[&str] = &["hitCount", "count"];
