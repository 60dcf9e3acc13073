use std::path::Path;

use pdfbridge::{Document, SearchHit};

use crate::cli::OutputFormat;
use crate::shared::{fail, open_document, print_json, resolve_pages};

pub fn run(
    file: &Path,
    needle: &str,
    pages: Option<&str>,
    max_hits: usize,
    format: OutputFormat,
    password: Option<&str>,
) -> Result<(), i32> {
    let doc = open_document(file, password)?;
    let page_indices = resolve_pages(pages, doc.count_pages())?;
    let hits = collect_hits(&doc, &page_indices, needle, max_hits)?;

    match format {
        OutputFormat::Text => {
            println!("page\tmark\tx0\ty0\tx1\ty1");
            for (page, hit) in &hits {
                let r = hit.quad.bounds();
                println!(
                    "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
                    page + 1,
                    hit.mark,
                    r.x0,
                    r.y0,
                    r.x1,
                    r.y1,
                );
            }
        }
        OutputFormat::Json => {
            let all: Vec<serde_json::Value> = hits
                .iter()
                .map(|(page, hit)| hit_to_json(hit, page + 1))
                .collect();
            print_json(&serde_json::Value::Array(all));
        }
    }
    Ok(())
}

/// Hits of every page in order; `max_hits` applies to each page.
fn collect_hits(
    doc: &Document,
    page_indices: &[usize],
    needle: &str,
    max_hits: usize,
) -> Result<Vec<(usize, SearchHit)>, i32> {
    let mut out = Vec::new();
    for &idx in page_indices {
        let page = doc.load_page(idx).map_err(fail)?;
        let hits = page.search(needle, max_hits).map_err(|e| {
            eprintln!("Error reading page {}: {e}", idx + 1);
            1
        })?;
        out.extend(hits.into_iter().map(|hit| (idx, hit)));
    }
    Ok(out)
}

fn hit_to_json(hit: &SearchHit, page_num: usize) -> serde_json::Value {
    let q = &hit.quad;
    let r = q.bounds();
    serde_json::json!({
        "page": page_num,
        "mark": hit.mark,
        "quad": [q.ul.x, q.ul.y, q.ur.x, q.ur.y, q.ll.x, q.ll.y, q.lr.x, q.lr.y],
        "x0": r.x0,
        "y0": r.y0,
        "x1": r.x1,
        "y1": r.y1,
    })
}
