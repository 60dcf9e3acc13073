use std::path::Path;

use pdfbridge::{
    AlternatingFilter, ContentFilter, FactoryArgs, FilterOptions, FilterSummary, FnFactory,
    ItemKind, KindFilter, per_stream,
};

use crate::cli::DropKind;
use crate::shared::{fail, open_document, resolve_pages};

pub struct FilterArgs<'a> {
    pub file: &'a Path,
    pub output: &'a Path,
    pub drop: &'a [DropKind],
    pub every_other: bool,
    pub recurse: bool,
    pub pages: Option<&'a str>,
    pub password: Option<&'a str>,
}

pub fn run(args: FilterArgs<'_>) -> Result<(), i32> {
    let mut options = build_options(args.drop, args.every_other, args.recurse)
        .ok_or_else(|| fail("nothing to filter: pass --drop or --every-other"))?;

    let doc = open_document(args.file, args.password)?;
    let page_indices = resolve_pages(args.pages, doc.count_pages())?;

    let mut total = FilterSummary::default();
    for &idx in &page_indices {
        let page = doc.load_page(idx).map_err(fail)?;
        let summary = doc
            .filter_page_contents(&page, &mut options)
            .map_err(|e| fail(format!("page {}: {e}", idx + 1)))?;
        total += summary;
    }
    doc.save(args.output).map_err(fail)?;

    println!(
        "Filtered {} page(s): {} stream(s) rewritten, {} of {} item(s) removed",
        page_indices.len(),
        total.streams,
        total.removed,
        total.items
    );
    Ok(())
}

/// Filter options for the given flags, or `None` if no filter was asked for.
fn build_options(drop: &[DropKind], every_other: bool, recurse: bool) -> Option<FilterOptions> {
    let kinds: Vec<ItemKind> = drop
        .iter()
        .flat_map(|kind| kind.item_kinds().iter().copied())
        .collect();
    if kinds.is_empty() && !every_other {
        return None;
    }

    let mut options = FilterOptions::default();
    options.recurse = recurse;
    if !kinds.is_empty() {
        options.add_factory(FnFactory::new(move |_: &FactoryArgs| {
            let filter = KindFilter::removing(kinds.iter().copied());
            Ok(Some(Box::new(filter) as Box<dyn ContentFilter>))
        }));
    }
    if every_other {
        options.add_factory(per_stream::<AlternatingFilter>());
    }
    Some(options)
}
