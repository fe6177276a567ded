use tracing::debug;

use super::{locate_facets, Extraction, FacetStrategy, FacetValues};
use crate::parsers::ScriptSet;

/// Facets whose values sit directly in a parseable JSON structure.
pub struct StructuredJson;

impl FacetStrategy for StructuredJson {
    fn name(&self) -> &'static str {
        "structured-json"
    }

    fn try_extract(&self, scripts: &ScriptSet) -> Option<Extraction> {
        for block in scripts.iter() {
            for facet in locate_facets(&block.text) {
                let FacetValues::Entries(values) = facet else {
                    continue;
                };

                let extraction = Extraction::from_values(&values);
                if extraction.entries.is_empty() {
                    debug!(
                        "Script #{}: brand facet has {} values but none carry a label and count",
                        block.index,
                        values.len()
                    );
                    continue;
                }

                debug!(
                    "Script #{}: brand facet found with {} entries",
                    block.index,
                    extraction.entries.len()
                );
                return Some(extraction);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawCount, RawEntry};

    #[test]
    fn extracts_from_next_data() {
        let scripts = ScriptSet::from_texts([
            "window.dataLayer = [];",
            r#"{"props":{"pageProps":{"__APOLLO_STATE__":{"ROOT_QUERY":{"_productList({\"page\":1})":{"facets":[{"key":"brand","label":"Designer","options":[{"name":"Amina Muaddi","count":41},{"name":"Gucci","count":12}]}]}}}}}}"#,
        ]);
        let extraction = StructuredJson.try_extract(&scripts).unwrap();
        assert_eq!(
            extraction.entries,
            vec![
                RawEntry::new("Amina Muaddi", RawCount::Integer(41)),
                RawEntry::new("Gucci", RawCount::Integer(12)),
            ]
        );
        assert_eq!(extraction.malformed, 0);
    }

    #[test]
    fn skips_facets_without_usable_values() {
        let scripts = ScriptSet::from_texts([
            r#"{"attributeId":"c_brand","values":[{"id":"x"}]}"#,
            r#"var b = {"attributeId":"c_brand","values":[{"label":"ACME","hitCount":3},{"label":"Odd"}]};"#,
        ]);
        let extraction = StructuredJson.try_extract(&scripts).unwrap();
        assert_eq!(extraction.entries.len(), 1);
        assert_eq!(extraction.malformed, 1);
    }

    #[test]
    fn leaves_references_to_the_next_strategy() {
        let scripts = ScriptSet::from_texts([r#"{"attributeId":"c_brand","values":"$62"}"#]);
        assert!(StructuredJson.try_extract(&scripts).is_none());
    }
}
