//! Fixture PDFs for the integration tests, built with lopdf.

#![allow(dead_code)]

use lopdf::content::Content;
use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use pdfbridge::pdfbridge_core::OutlineNode;

/// Builds a small PDF one feature at a time.
///
/// Every page is US Letter and shares one resource dictionary holding a
/// Helvetica font as `/F1`.
pub struct Fixture {
    doc: lopdf::Document,
    page_ids: Vec<ObjectId>,
    resources_id: ObjectId,
}

impl Fixture {
    pub fn new(contents: &[&[u8]]) -> Self {
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

        let mut page_ids = Vec::new();
        for content in contents {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources_id,
            }));
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
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Self {
            doc,
            page_ids,
            resources_id,
        }
    }

    /// `count` pages, each showing `words` text items.
    pub fn with_words(count: usize, words: usize) -> Self {
        let content = text_content(words);
        let contents: Vec<&[u8]> = vec![content.as_slice(); count];
        Self::new(&contents)
    }

    /// Add an outline. Items with a `#page=N` uri get an explicit
    /// destination, other uris a URI action.
    pub fn outline(mut self, roots: &[OutlineNode]) -> Self {
        let outlines_id = self.doc.new_object_id();
        let (first, last, count) = self.add_level(roots, outlines_id);
        let mut outlines = dictionary! { "Type" => "Outlines" };
        if let (Some(first), Some(last)) = (first, last) {
            outlines.set("First", first);
            outlines.set("Last", last);
            outlines.set("Count", count);
        }
        self.doc
            .objects
            .insert(outlines_id, Object::Dictionary(outlines));
        self.catalog_mut().set("Outlines", outlines_id);
        self
    }

    fn add_level(
        &mut self,
        nodes: &[OutlineNode],
        parent: ObjectId,
    ) -> (Option<ObjectId>, Option<ObjectId>, i64) {
        let ids: Vec<ObjectId> = nodes.iter().map(|_| self.doc.new_object_id()).collect();
        let mut visible = 0;
        for (i, node) in nodes.iter().enumerate() {
            let mut dict = dictionary! {
                "Title" => Object::string_literal(node.item.title.as_str()),
                "Parent" => parent,
            };
            if i > 0 {
                dict.set("Prev", ids[i - 1]);
            }
            if let Some(next) = ids.get(i + 1) {
                dict.set("Next", *next);
            }
            match node.item.uri.as_deref() {
                Some(uri) if uri.starts_with("#page=") => {
                    let n: usize = uri["#page=".len()..].parse().unwrap();
                    dict.set(
                        "Dest",
                        vec![self.page_ids[n - 1].into(), Object::Name(b"Fit".to_vec())],
                    );
                }
                Some(uri) => dict.set(
                    "A",
                    dictionary! { "S" => "URI", "URI" => Object::string_literal(uri) },
                ),
                None => {}
            }
            let (first, last, count) = self.add_level(&node.children, ids[i]);
            if let (Some(first), Some(last)) = (first, last) {
                dict.set("First", first);
                dict.set("Last", last);
                dict.set("Count", if node.item.is_open { count } else { -count });
            }
            visible += 1 + if node.item.is_open { count } else { 0 };
            self.doc.objects.insert(ids[i], Object::Dictionary(dict));
        }
        (ids.first().copied(), ids.last().copied(), visible)
    }

    /// Add a URI link annotation to a page.
    pub fn link(mut self, page: usize, rect: [i64; 4], uri: &str) -> Self {
        let annot = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
            "A" => dictionary! { "S" => "URI", "URI" => Object::string_literal(uri) },
        });
        let page_dict = self.page_mut(page);
        let mut annots = match page_dict.get(b"Annots") {
            Ok(Object::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        annots.push(annot.into());
        page_dict.set("Annots", annots);
        self
    }

    /// Add a Form XObject to the shared resources as `name`.
    pub fn form(mut self, name: &str, content: &[u8]) -> Self {
        let form = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            },
            content.to_vec(),
        ));
        let resources = self
            .doc
            .get_dictionary_mut(self.resources_id)
            .expect("resources");
        let mut xobjects = match resources.get(b"XObject") {
            Ok(Object::Dictionary(d)) => d.clone(),
            _ => Dictionary::new(),
        };
        xobjects.set(name, form);
        resources.set("XObject", xobjects);
        self
    }

    /// Set an `/Info` entry.
    pub fn info(mut self, key: &str, value: &str) -> Self {
        let info_id = match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => *id,
            _ => {
                let id = self.doc.add_object(Dictionary::new());
                self.doc.trailer.set("Info", id);
                id
            }
        };
        self.doc
            .get_dictionary_mut(info_id)
            .expect("info")
            .set(key, Object::string_literal(value));
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut out = Vec::new();
        self.doc.save_to(&mut out).expect("failed to save fixture");
        out
    }

    /// Save with RC4-128 encryption under the given user password.
    pub fn build_encrypted(mut self, user_password: &str) -> Vec<u8> {
        use lopdf::{EncryptionState, EncryptionVersion, Permissions, StringFormat};

        let id = Object::String(b"pdfbridge-fixture".to_vec(), StringFormat::Hexadecimal);
        self.doc.trailer.set("ID", vec![id.clone(), id]);
        let version = EncryptionVersion::V2 {
            document: &self.doc,
            owner_password: "owner-secret",
            user_password,
            key_length: 128,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).expect("encryption state");
        self.doc.encrypt(&state).expect("failed to encrypt fixture");
        self.build()
    }

    fn catalog_mut(&mut self) -> &mut Dictionary {
        let root = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(|r| r.as_reference())
            .expect("root");
        self.doc.get_dictionary_mut(root).expect("catalog")
    }

    fn page_mut(&mut self, page: usize) -> &mut Dictionary {
        let id = self.page_ids[page];
        self.doc.get_dictionary_mut(id).expect("page")
    }
}

/// `BT /F1 12 Tf 72 700 Td (w0) Tj (w1) Tj ... ET`.
pub fn text_content(words: usize) -> Vec<u8> {
    let mut content = b"BT /F1 12 Tf 72 700 Td".to_vec();
    for i in 0..words {
        content.extend_from_slice(format!(" (w{i}) Tj").as_bytes());
    }
    content.extend_from_slice(b" ET");
    content
}

/// Operators of a page's content in saved PDF bytes.
pub fn page_operators(pdf: &[u8], page: usize) -> Vec<String> {
    let doc = lopdf::Document::load_mem(pdf).expect("reload");
    let page_id = doc.get_pages()[&(page as u32 + 1)];
    let content = doc.get_page_content(page_id).expect("page content");
    Content::decode(&content)
        .expect("decode")
        .operations
        .into_iter()
        .map(|op| op.operator)
        .collect()
}

/// Number of text-showing operators on a page of saved PDF bytes.
pub fn shown_count(pdf: &[u8], page: usize) -> usize {
    page_operators(pdf, page)
        .iter()
        .filter(|op| op.as_str() == "Tj")
        .count()
}
