use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pdfbridge::bridge::FILTER_FACTORY;
use pdfbridge::{
    AlternatingFilter, Bitmap, BitmapDetails, ContentFilter, Context, Document, FactoryArgs,
    FilterFactory, FilterOptions, HandlerError, OperationState, Signature, SystemFontFuncs,
    per_stream,
};
use tracing::debug;

use crate::shared::open_document;

type Check = fn(&Document) -> Result<(), String>;

const CHECKS: &[(&str, Check)] = &[
    ("page-range", check_page_range),
    ("alternating-filter", check_alternating_filter),
    ("misdeclared-factory", check_misdeclared_factory),
    ("outline-walk", check_outline_walk),
    ("text-search", check_text_search),
    ("font-hooks", check_font_hooks),
    ("bitmap-details", check_bitmap_details),
];

pub fn run(files: &[PathBuf]) -> Result<(), i32> {
    let mut total = 0;
    let mut failed = 0;
    for file in files {
        let (ran, failures) = check_file(file);
        total += ran;
        failed += failures;
    }
    println!("{total} checks, {failed} failed");
    if failed > 0 { Err(1) } else { Ok(()) }
}

/// Run every check against `file`, returning how many ran and failed.
///
/// Each check opens its own copy so that one check's edits never leak
/// into the next.
fn check_file(file: &Path) -> (usize, usize) {
    let mut failed = 0;
    for (name, check) in CHECKS {
        let outcome = open_document(file, None)
            .map_err(|_| "could not open file".to_string())
            .and_then(|doc| check(&doc));
        match outcome {
            Ok(()) => println!("ok\t{}\t{name}", file.display()),
            Err(reason) => {
                failed += 1;
                println!("FAIL\t{}\t{name}\t{reason}", file.display());
            }
        }
    }
    (CHECKS.len(), failed)
}

fn check_page_range(doc: &Document) -> Result<(), String> {
    let err = match doc.load_page(99_999_999) {
        Ok(_) => return Err("page 100000000 loaded".into()),
        Err(err) => err,
    };
    let text = err.to_string();
    if !text.contains("invalid page number: 100000000") {
        return Err(format!("unexpected error: {text}"));
    }
    if doc.count_pages() > 0 {
        doc.load_page(0)
            .map_err(|e| format!("first page unusable after error: {e}"))?;
    }
    Ok(())
}

fn check_alternating_filter(doc: &Document) -> Result<(), String> {
    for idx in 0..doc.count_pages() {
        let page = doc.load_page(idx).map_err(|e| e.to_string())?;
        let mut options = FilterOptions::default();
        options.add_factory(per_stream::<AlternatingFilter>());
        let summary = doc
            .filter_page_contents(&page, &mut options)
            .map_err(|e| e.to_string())?;
        debug!(page = idx, ?summary, "alternating filter");
        if summary.streams > 0 && summary.removed != summary.items / 2 {
            return Err(format!(
                "page {}: removed {} of {} items",
                idx + 1,
                summary.removed,
                summary.items
            ));
        }
    }
    Ok(())
}

/// Declares one parameter more than the extension point passes.
struct ExtraArgFactory;

impl FilterFactory for ExtraArgFactory {
    fn signature(&self) -> Signature {
        FILTER_FACTORY
            .to_signature()
            .renamed("filter_bad")
            .with_param("extra_arg")
    }

    fn create(
        &mut self,
        _args: &FactoryArgs,
    ) -> Result<Option<Box<dyn ContentFilter>>, HandlerError> {
        Ok(Some(Box::new(AlternatingFilter::new())))
    }
}

fn check_misdeclared_factory(doc: &Document) -> Result<(), String> {
    if doc.count_pages() == 0 {
        return Ok(());
    }
    let page = doc.load_page(0).map_err(|e| e.to_string())?;

    doc.begin_operation("Filter").map_err(|e| e.to_string())?;
    let mut options = FilterOptions::default();
    options.add_factory(ExtraArgFactory);
    let result = doc.filter_page_contents(&page, &mut options);
    let operation = doc.end_operation().map_err(|e| e.to_string())?;

    match result {
        Ok(_) => return Err("mis-declared factory was accepted".into()),
        Err(err) => {
            let text = err.to_string();
            if !text.contains("filter_bad() missing 1 required positional argument: 'extra_arg'")
            {
                return Err(format!("unexpected error: {text}"));
            }
        }
    }
    if operation.state() != OperationState::Failed {
        return Err(format!("operation ended {:?}", operation.state()));
    }

    doc.begin_operation("Next")
        .and_then(|()| doc.end_operation())
        .map_err(|e| format!("document unusable after failure: {e}"))?;
    Ok(())
}

fn check_outline_walk(doc: &Document) -> Result<(), String> {
    let walker = doc.outline().map_err(|e| e.to_string())?;
    let mut count = 0;
    for entry in walker {
        entry.map_err(|e| format!("after {count} items: {e}"))?;
        count += 1;
    }
    debug!(count, "outline walk");
    Ok(())
}

/// The first word of each page's text is found by searching for it.
fn check_text_search(doc: &Document) -> Result<(), String> {
    for idx in 0..doc.count_pages() {
        let page = doc.load_page(idx).map_err(|e| e.to_string())?;
        let text = page.stext_page().map_err(|e| e.to_string())?.text();
        let Some(word) = text.split_whitespace().next() else {
            continue;
        };
        let hits = page.search(word, 20).map_err(|e| e.to_string())?;
        debug!(page = idx, word, hits = hits.len(), "text search");
        if hits.first().is_none_or(|hit| hit.mark != 0) {
            return Err(format!("page {}: '{word}' not found", idx + 1));
        }
    }
    Ok(())
}

fn check_font_hooks(_doc: &Document) -> Result<(), String> {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let mut ctx = Context::new();
    ctx.install_system_font_funcs(SystemFontFuncs::new().on_font(move |_| {
        seen.set(seen.get() + 1);
        Ok(None)
    }));

    ctx.load_system_font("Helvetica", false, false, false)
        .map_err(|e| e.to_string())?;
    ctx.uninstall_system_font_funcs();
    let after = ctx
        .load_system_font("Helvetica", false, false, false)
        .map_err(|e| e.to_string())?;

    if calls.get() != 1 {
        return Err(format!("hook called {} times", calls.get()));
    }
    if after.is_some() {
        return Err("lookup answered after uninstall".into());
    }
    Ok(())
}

fn check_bitmap_details(_doc: &Document) -> Result<(), String> {
    let details = Bitmap::new(10, 20, 8, 72, 72).details();
    let expected = BitmapDetails {
        width: 10,
        height: 20,
        n: 8,
        stride: 12,
    };
    if details == expected {
        Ok(())
    } else {
        Err(format!("got {details:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_free_checks_pass() {
        let doc = Document::open(minimal_pdf().as_slice(), None).unwrap();
        assert_eq!(check_font_hooks(&doc), Ok(()));
        assert_eq!(check_bitmap_details(&doc), Ok(()));
        assert_eq!(check_page_range(&doc), Ok(()));
        assert_eq!(check_text_search(&doc), Ok(()));
    }

    fn minimal_pdf() -> Vec<u8> {
        use lopdf::{Object, Stream, dictionary};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}
