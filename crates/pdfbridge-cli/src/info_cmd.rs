use std::path::Path;

use pdfbridge::Document;

use crate::cli::OutputFormat;
use crate::shared::{fail, open_document, print_json};

/// Metadata keys reported by `info`, in output order.
const METADATA_KEYS: &[&str] = &[
    "format",
    "encryption",
    "info:Author",
    "info:Title",
    "info:Creator",
    "info:Producer",
];

pub fn run(file: &Path, format: OutputFormat, password: Option<&str>) -> Result<(), i32> {
    let doc = open_document(file, password)?;
    let metadata = collect_metadata(&doc)?;

    match format {
        OutputFormat::Text => {
            println!("Pages: {}", doc.count_pages());
            println!(
                "Needs password: {}",
                if doc.needs_password() { "yes" } else { "no" }
            );
            for (key, value) in &metadata {
                if let Some(value) = value {
                    println!("{key}: {value}");
                }
            }
        }
        OutputFormat::Json => {
            let mut map = serde_json::Map::new();
            for (key, value) in metadata {
                map.insert(key.to_string(), serde_json::json!(value));
            }
            print_json(&serde_json::json!({
                "pages": doc.count_pages(),
                "needs_password": doc.needs_password(),
                "metadata": map,
            }));
        }
    }
    Ok(())
}

fn collect_metadata(doc: &Document) -> Result<Vec<(&'static str, Option<String>)>, i32> {
    METADATA_KEYS
        .iter()
        .map(|&key| Ok((key, doc.lookup_metadata(key).map_err(fail)?)))
        .collect()
}
