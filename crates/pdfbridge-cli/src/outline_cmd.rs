use std::path::Path;

use pdfbridge::OutlineEntry;

use crate::cli::OutputFormat;
use crate::shared::{fail, open_document, print_json};

pub fn run(file: &Path, format: OutputFormat, password: Option<&str>) -> Result<(), i32> {
    let doc = open_document(file, password)?;
    let entries: Vec<OutlineEntry> = doc
        .outline()
        .map_err(fail)?
        .collect::<Result<_, _>>()
        .map_err(fail)?;

    match format {
        OutputFormat::Text => {
            for entry in &entries {
                println!("{}", format_entry(entry));
            }
            println!("{} items", entries.len());
        }
        OutputFormat::Json => {
            let value = serde_json::to_value(&entries).map_err(fail)?;
            print_json(&value);
        }
    }
    Ok(())
}

/// Four spaces per level, then the title and the link target, if any.
fn format_entry(entry: &OutlineEntry) -> String {
    let indent = "    ".repeat(entry.depth);
    match &entry.item.uri {
        Some(uri) => format!("{indent}{}\t{uri}", entry.item.title),
        None => format!("{indent}{}", entry.item.title),
    }
}
