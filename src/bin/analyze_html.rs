use anyhow::{bail, Context, Result};
use std::fs;

use brand_facet_extractor::config::Config;
use brand_facet_extractor::models::{DocumentOrigin, RawDocument};
use brand_facet_extractor::normalize::Normalizer;
use brand_facet_extractor::parsers::{
    looks_escaped, normalize_scripts, parse_document, ScriptSet, RSC_PUSH_MARKER,
};
use brand_facet_extractor::strategies::{default_strategies, locate_facets, BRAND_ATTRIBUTE_ID};
use brand_facet_extractor::utils::decode::decode_document;

const MARKERS: &[&str] = &[BRAND_ATTRIBUTE_ID, "hitCount", "\"values\":\"$", RSC_PUSH_MARKER, "__NEXT_DATA__"];
const PREVIEW_ROWS: usize = 10;

fn main() -> Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: analyze_html <saved-page.html>");
    };

    let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path))?;
    let document = RawDocument::new(bytes, DocumentOrigin::File(path.clone()));
    let decoded = decode_document(&document)?;
    println!(
        "{}: {} bytes, decoded as {}{}",
        path,
        document.bytes.len(),
        decoded.encoding,
        if decoded.fallback { " (fallback)" } else { "" }
    );

    let parsed = parse_document(&decoded.text)?;
    println!(
        "Found {} script blocks{}",
        parsed.scripts.len(),
        if parsed.permissive { " (permissive scan)" } else { "" }
    );

    let payloads = normalize_scripts(&parsed.scripts).unwrap_or_else(|| ScriptSet::new(Vec::new()));
    if !payloads.is_empty() {
        println!("Decoded {} escaped payload blocks", payloads.len());
    }

    for block in parsed.scripts.chained(&payloads).iter() {
        let markers: Vec<&str> = MARKERS
            .iter()
            .copied()
            .filter(|marker| block.text.contains(marker))
            .collect();
        if markers.is_empty() && !looks_escaped(&block.text) {
            continue;
        }
        println!(
            "  {:<7} #{:<4} id={:<20} {:>9} chars  escaped={:<5} facets={} markers={:?}",
            if block.synthetic { "decoded" } else { "page" },
            block.index,
            block.id.as_deref().unwrap_or("-"),
            block.text.chars().count(),
            looks_escaped(&block.text),
            locate_facets(&block.text).len(),
            markers
        );
    }

    let config = Config::default();
    let normalizer = Normalizer::from_config(&config.extraction);

    for strategy in default_strategies() {
        println!("\nStrategy {}:", strategy.name());
        let Some(extraction) = strategy.try_extract(&parsed.scripts) else {
            println!("  no brand facet");
            continue;
        };

        let batch = normalizer.normalize_all(&extraction.entries, extraction.validation);
        println!(
            "  {} raw entries, {} valid, {} rejected, {} missing definitions, {} malformed",
            extraction.entries.len(),
            batch.entries.len(),
            batch.rejected_total(),
            extraction.missing_definitions,
            extraction.malformed
        );
        for (reason, count) in &batch.rejected {
            println!("  rejected {}: {}", reason, count);
        }
        for entry in batch.entries.iter().take(PREVIEW_ROWS) {
            println!("    {}", entry);
        }
        if batch.entries.len() > PREVIEW_ROWS {
            println!("    ... {} more", batch.entries.len() - PREVIEW_ROWS);
        }
    }

    Ok(())
}
