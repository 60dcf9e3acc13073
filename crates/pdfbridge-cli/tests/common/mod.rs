//! Shared helpers for the CLI integration tests.

#![allow(dead_code)]

use std::io::Write;

use assert_cmd::Command;
use lopdf::content::Content;
use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use tempfile::NamedTempFile;

pub fn cmd() -> Command {
    Command::cargo_bin("pdfbridge").unwrap()
}

/// Write PDF bytes to a temporary file kept alive by the returned guard.
pub fn write_temp_pdf(bytes: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(bytes).unwrap();
    tmp.flush().unwrap();
    tmp
}

/// `BT /F1 12 Tf 72 700 Td (w0) Tj ... ET`.
pub fn text_content(words: usize) -> Vec<u8> {
    let mut content = b"BT /F1 12 Tf 72 700 Td".to_vec();
    for i in 0..words {
        content.extend_from_slice(format!(" (w{i}) Tj").as_bytes());
    }
    content.extend_from_slice(b" ET");
    content
}

/// A US Letter PDF whose pages share a Helvetica `/F1`.
///
/// Page 1 carries a URI link, and the document has a two-level outline:
/// `Intro -> Details`, then `Appendix` pointing at the last page.
pub fn sample_pdf(contents: &[&[u8]]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let link_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![72.into(), 710.into(), 200.into(), 730.into()],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal("https://example.com"),
        },
    });

    let mut page_ids = Vec::new();
    for (i, content) in contents.iter().enumerate() {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        };
        if i == 0 {
            page.set("Annots", vec![Object::Reference(link_id)]);
        }
        page_ids.push(doc.add_object(page));
    }
    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let outlines_id = add_outline(&mut doc, &page_ids);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Quarterly Report"),
        "Author" => Object::string_literal("R. Tester"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "Outlines" => outlines_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn add_outline(doc: &mut lopdf::Document, page_ids: &[ObjectId]) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let intro_id = doc.new_object_id();
    let details_id = doc.new_object_id();
    let appendix_id = doc.new_object_id();
    let first_page = page_ids[0];
    let last_page = page_ids[page_ids.len() - 1];

    let entries: [(ObjectId, Dictionary); 3] = [
        (
            intro_id,
            dictionary! {
                "Title" => Object::string_literal("Intro"),
                "Parent" => outlines_id,
                "Next" => appendix_id,
                "First" => details_id,
                "Last" => details_id,
                "Count" => 1,
                "Dest" => vec![first_page.into(), Object::Name(b"Fit".to_vec())],
            },
        ),
        (
            details_id,
            dictionary! {
                "Title" => Object::string_literal("Details"),
                "Parent" => intro_id,
                "A" => dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal("https://example.com/details"),
                },
            },
        ),
        (
            appendix_id,
            dictionary! {
                "Title" => Object::string_literal("Appendix"),
                "Parent" => outlines_id,
                "Prev" => intro_id,
                "Dest" => vec![last_page.into(), Object::Name(b"Fit".to_vec())],
            },
        ),
    ];
    for (id, dict) in entries {
        doc.objects.insert(id, Object::Dictionary(dict));
    }
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => intro_id,
            "Last" => appendix_id,
            "Count" => 3,
        }),
    );
    outlines_id
}

/// Number of `Tj` operators on a page of a saved PDF file.
pub fn shown_count(path: &std::path::Path, page: u32) -> usize {
    let doc = lopdf::Document::load(path).unwrap();
    let page_id = doc.get_pages()[&(page + 1)];
    let content = doc.get_page_content(page_id).unwrap();
    Content::decode(&content)
        .unwrap()
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .count()
}
