use std::path::Path;

use pdfbridge::{Document, StextPage, TextChar, TextLine};

use crate::cli::OutputFormat;
use crate::shared::{fail, open_document, print_json, resolve_pages};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    chars: bool,
    format: OutputFormat,
    password: Option<&str>,
) -> Result<(), i32> {
    let doc = open_document(file, password)?;
    let page_indices = resolve_pages(pages, doc.count_pages())?;
    let texts = collect_text(&doc, &page_indices)?;

    match format {
        OutputFormat::Text if chars => {
            println!("page\tblock\tline\tchar\tx\ty\tsize\tfont");
            for (page, text) in &texts {
                for (b, block) in text.blocks.iter().enumerate() {
                    for (l, line) in block.lines.iter().enumerate() {
                        for ch in &line.chars {
                            println!(
                                "{}\t{b}\t{l}\t{:?}\t{:.2}\t{:.2}\t{:.2}\t{}",
                                page + 1,
                                ch.c,
                                ch.origin.x,
                                ch.origin.y,
                                ch.size,
                                ch.font,
                            );
                        }
                    }
                }
            }
        }
        OutputFormat::Text => {
            for (page, text) in &texts {
                println!("--- page {} ---", page + 1);
                println!("{}", text.text());
            }
        }
        OutputFormat::Json => {
            let all: Vec<serde_json::Value> = texts
                .iter()
                .map(|(page, text)| page_to_json(text, page + 1, chars))
                .collect();
            print_json(&serde_json::Value::Array(all));
        }
    }
    Ok(())
}

fn collect_text(doc: &Document, page_indices: &[usize]) -> Result<Vec<(usize, StextPage)>, i32> {
    let mut out = Vec::with_capacity(page_indices.len());
    for &idx in page_indices {
        let page = doc.load_page(idx).map_err(fail)?;
        let text = page.stext_page().map_err(|e| {
            eprintln!("Error reading page {}: {e}", idx + 1);
            1
        })?;
        out.push((idx, text));
    }
    Ok(out)
}

fn page_to_json(text: &StextPage, page_num: usize, chars: bool) -> serde_json::Value {
    let blocks: Vec<serde_json::Value> = text
        .blocks
        .iter()
        .map(|block| {
            let bbox = block.bbox();
            let lines: Vec<serde_json::Value> =
                block.lines.iter().map(|line| line_to_json(line, chars)).collect();
            serde_json::json!({
                "bbox": [bbox.x0, bbox.y0, bbox.x1, bbox.y1],
                "lines": lines,
            })
        })
        .collect();
    serde_json::json!({
        "page": page_num,
        "width": text.bound.width(),
        "height": text.bound.height(),
        "blocks": blocks,
    })
}

fn line_to_json(line: &TextLine, chars: bool) -> serde_json::Value {
    let bbox = line.bbox();
    let mut value = serde_json::json!({
        "bbox": [bbox.x0, bbox.y0, bbox.x1, bbox.y1],
        "dir": [line.dir.x, line.dir.y],
        "text": line.text(),
    });
    if chars {
        value["chars"] = line.chars.iter().map(char_to_json).collect();
    }
    value
}

fn char_to_json(ch: &TextChar) -> serde_json::Value {
    let q = &ch.quad;
    serde_json::json!({
        "c": ch.c.to_string(),
        "origin": [ch.origin.x, ch.origin.y],
        "quad": [q.ul.x, q.ul.y, q.ur.x, q.ur.y, q.ll.x, q.ll.y, q.lr.x, q.lr.y],
        "size": ch.size,
        "font": ch.font,
    })
}
