use std::path::Path;

use pdfbridge::{Context, Document, Font, FontResolution, FontSource, SystemFontFuncs};

use crate::cli::OutputFormat;
use crate::shared::{fail, open_document, print_json, resolve_pages};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    substitute: Option<&Path>,
    format: OutputFormat,
    password: Option<&str>,
) -> Result<(), i32> {
    let mut ctx = Context::new();
    if let Some(path) = substitute {
        let font = Font::from_file(path).map_err(fail)?;
        ctx.install_system_font_funcs(substitute_funcs(font));
    }

    let doc = open_document(file, password)?;
    let page_indices = resolve_pages(pages, doc.count_pages())?;
    let resolved = resolve_all(&doc, &mut ctx, &page_indices)?;

    match format {
        OutputFormat::Text => {
            println!("page\tresource\tbase_font\tsubtype\tsource\tfont");
            for (page, r) in &resolved {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    page + 1,
                    r.font.resource,
                    r.font.base_font,
                    r.font.subtype,
                    source_str(r.source),
                    r.loaded.as_ref().map_or("-", |f| f.name()),
                );
            }
        }
        OutputFormat::Json => {
            let mut all = Vec::with_capacity(resolved.len());
            for (page, r) in &resolved {
                all.push(serde_json::json!({
                    "page": page + 1,
                    "font": serde_json::to_value(&r.font).map_err(fail)?,
                    "source": source_str(r.source),
                    "loaded": r.loaded.as_ref().map(|f| f.name()),
                }));
            }
            print_json(&serde_json::Value::Array(all));
        }
    }
    Ok(())
}

/// Hooks answering every named and CJK lookup with `font`.
fn substitute_funcs(font: Font) -> SystemFontFuncs {
    let for_cjk = font.clone();
    SystemFontFuncs::new()
        .on_font(move |_| Ok(Some(font.clone())))
        .on_cjk(move |_| Ok(Some(for_cjk.clone())))
}

fn resolve_all(
    doc: &Document,
    ctx: &mut Context,
    page_indices: &[usize],
) -> Result<Vec<(usize, FontResolution)>, i32> {
    let mut out = Vec::new();
    for &idx in page_indices {
        let page = doc.load_page(idx).map_err(fail)?;
        let resolved = doc.resolve_page_fonts(ctx, &page).map_err(fail)?;
        out.extend(resolved.into_iter().map(|r| (idx, r)));
    }
    Ok(out)
}

fn source_str(source: FontSource) -> &'static str {
    match source {
        FontSource::Embedded => "embedded",
        FontSource::System => "system",
        FontSource::Fallback => "fallback",
        FontSource::Unresolved => "unresolved",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_answers_every_lookup() {
        let mut ctx = Context::new();
        ctx.install_system_font_funcs(substitute_funcs(Font::new("Stand-in", 3)));
        let named = ctx.load_system_font("Courier", false, false, false).unwrap();
        assert_eq!(named.map(|f| f.name().to_string()).as_deref(), Some("Stand-in"));
        let cjk = ctx
            .load_system_cjk_font("SimSun", pdfbridge::CjkOrdering::Gb1, true)
            .unwrap();
        assert!(cjk.is_some());
    }

    #[test]
    fn source_names() {
        assert_eq!(source_str(FontSource::Unresolved), "unresolved");
        assert_eq!(source_str(FontSource::System), "system");
    }
}
