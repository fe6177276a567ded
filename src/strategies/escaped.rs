use tracing::debug;

use super::{Extraction, FacetStrategy, ReferenceIndexed, StructuredJson};
use crate::parsers::{normalize_scripts, ScriptSet};

/// Facets hidden inside string-literal payloads (RSC push chunks, escaped
/// state blobs). The payloads are unescaped, then searched like plain JSON.
pub struct EscapedPayload;

impl FacetStrategy for EscapedPayload {
    fn name(&self) -> &'static str {
        "escaped-payload"
    }

    fn try_extract(&self, scripts: &ScriptSet) -> Option<Extraction> {
        let payloads = normalize_scripts(scripts)?;
        debug!("Decoded {} escaped payload blocks", payloads.len());

        if let Some(extraction) = StructuredJson.try_extract(&payloads) {
            return Some(extraction);
        }

        // Definitions may sit in plain scripts while the facet is escaped, or the reverse
        let combined = payloads.chained(scripts);
        ReferenceIndexed.try_extract(&combined)
    }
}
