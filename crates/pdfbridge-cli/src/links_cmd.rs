use std::path::Path;

use pdfbridge::{Document, Link};

use crate::cli::OutputFormat;
use crate::shared::{fail, open_document, print_json, resolve_pages};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    format: OutputFormat,
    password: Option<&str>,
) -> Result<(), i32> {
    let doc = open_document(file, password)?;
    let page_indices = resolve_pages(pages, doc.count_pages())?;
    let links = collect_links(&doc, &page_indices)?;

    match format {
        OutputFormat::Text => {
            println!("page\turi\tx0\ty0\tx1\ty1");
            for (page, link) in &links {
                println!(
                    "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
                    page + 1,
                    link.uri,
                    link.rect.x0,
                    link.rect.y0,
                    link.rect.x1,
                    link.rect.y1,
                );
            }
        }
        OutputFormat::Json => {
            let all: Vec<serde_json::Value> = links
                .iter()
                .map(|(page, link)| link_to_json(link, page + 1))
                .collect();
            print_json(&serde_json::Value::Array(all));
        }
    }
    Ok(())
}

fn collect_links(doc: &Document, page_indices: &[usize]) -> Result<Vec<(usize, Link)>, i32> {
    let mut out = Vec::new();
    for &idx in page_indices {
        let page = doc.load_page(idx).map_err(fail)?;
        let links = page.links().map_err(|e| {
            eprintln!("Error reading page {}: {e}", idx + 1);
            1
        })?;
        out.extend(links.into_iter().map(|link| (idx, link)));
    }
    Ok(out)
}

fn link_to_json(link: &Link, page_num: usize) -> serde_json::Value {
    serde_json::json!({
        "page": page_num,
        "uri": link.uri,
        "internal": link.is_internal(),
        "x0": link.rect.x0,
        "y0": link.rect.y0,
        "x1": link.rect.x1,
        "y1": link.rect.y1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfbridge::Rect;

    #[test]
    fn json_shape() {
        let link = Link::new(Rect::new(1.0, 2.0, 3.0, 4.0), "#page=2");
        let value = link_to_json(&link, 1);
        assert_eq!(value["page"], 1);
        assert_eq!(value["uri"], "#page=2");
        assert_eq!(value["internal"], true);
        assert_eq!(value["y1"], 4.0);
    }
}
