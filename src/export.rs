use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::models::{BrandTable, Site};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV bytes with a header row and one row per brand.
pub fn to_csv_bytes(table: &BrandTable, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    if config.byte_order_mark {
        buffer.extend_from_slice(UTF8_BOM);
    }

    let mut writer = csv::Writer::from_writer(buffer);
    writer.write_record([config.brand_header.as_str(), config.count_header.as_str()])?;
    for row in table {
        writer.write_record([row.name.as_str(), row.count.to_string().as_str()])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

pub async fn write_csv(table: &BrandTable, config: &ExportConfig, path: &Path) -> Result<(), ExportError> {
    let bytes = to_csv_bytes(table, config)?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| ExportError::Write {
            path: path.display().to_string(),
            source,
        })?;
    info!("Wrote {} brands to {}", table.len(), path.display());
    Ok(())
}

/// `<site>_brands_<YYYYMMDD-HHMMSS>.csv`
pub fn default_file_name(site: Site, now: &DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "{}_brands_{}.csv",
        site.key(),
        now.format("%Y%m%d-%H%M%S")
    ))
}

/// Plain-text table for the console.
pub fn render_table(table: &BrandTable, config: &ExportConfig) -> String {
    let name_width = table
        .iter()
        .map(|row| row.name.chars().count())
        .chain(std::iter::once(config.brand_header.chars().count()))
        .max()
        .unwrap_or(0);
    let count_width = table
        .iter()
        .map(|row| row.count.to_string().len())
        .chain(std::iter::once(config.count_header.chars().count()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<name_width$}  {:>count_width$}\n",
        config.brand_header, config.count_header
    ));
    out.push_str(&format!(
        "{}  {}\n",
        "-".repeat(name_width),
        "-".repeat(count_width)
    ));
    for row in table {
        out.push_str(&format!(
            "{:<name_width$}  {:>count_width$}\n",
            row.name, row.count
        ));
    }
    out.push_str(&format!("{} brands, {} products\n", table.len(), table.total_count()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, MergePolicy, SortOrder};
    use crate::config::Config;
    use crate::models::BrandEntry;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn table() -> BrandTable {
        aggregate(
            vec![BrandEntry::new("ACME", 12), BrandEntry::new("Dior, Paris", 3)],
            MergePolicy::Max,
            SortOrder::CaseInsensitive,
        )
        .table
    }

    #[test]
    fn csv_has_bom_header_and_quoted_rows() {
        let bytes = to_csv_bytes(&table(), &Config::default().export).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "Brand,Count\nACME,12\n\"Dior, Paris\",3\n");
    }

    #[test]
    fn bom_and_headers_are_configurable() {
        let mut config = Config::default().export;
        config.byte_order_mark = false;
        config.brand_header = "Marka".to_string();
        config.count_header = "Adet".to_string();

        let bytes = to_csv_bytes(&BrandTable::default(), &config).unwrap();
        assert_eq!(bytes, b"Marka,Adet\n");
    }

    #[test]
    fn default_file_name_uses_site_and_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 5).unwrap();
        assert_eq!(
            default_file_name(Site::Sephora, &now),
            PathBuf::from("sephora_brands_20240501-093005.csv")
        );
        assert_eq!(
            default_file_name(Site::Other, &now),
            PathBuf::from("plp_brands_20240501-093005.csv")
        );
    }

    #[test]
    fn rendered_table_aligns_columns() {
        let rendered = render_table(&table(), &Config::default().export);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Brand        Count");
        assert_eq!(lines[2], "ACME            12");
        assert_eq!(lines[3], "Dior, Paris      3");
        assert_eq!(lines[4], "2 brands, 15 products");
    }
}
