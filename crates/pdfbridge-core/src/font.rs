//! Fonts and the system-font lookup extension points.
//!
//! The engine asks for system fonts when a document uses a font it does not
//! embed. [`SystemFontFuncs`] is the caller's handler set for the three
//! lookup points; an entry left unset means the engine default (no system
//! font).

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::bridge::{LOAD_SYSTEM_CJK_FONT, LOAD_SYSTEM_FALLBACK_FONT, LOAD_SYSTEM_FONT};
use crate::{ErrorCode, HandlerError, PdfError, Signature};

/// A loaded font.
#[derive(Clone, PartialEq, Eq)]
pub struct Font {
    name: String,
    glyph_count: u32,
    data: Option<Arc<[u8]>>,
}

impl Font {
    /// A font known only by name and glyph count.
    pub fn new(name: impl Into<String>, glyph_count: u32) -> Self {
        Self {
            name: name.into(),
            glyph_count,
            data: None,
        }
    }

    /// Parse a TrueType/OpenType font program.
    ///
    /// The name is the PostScript name from the `name` table, falling back
    /// to the full name and then to `fallback_name`.
    ///
    /// # Errors
    ///
    /// Returns a `Format` engine error if the data is not a font `ttf-parser`
    /// can read.
    pub fn from_bytes(data: Vec<u8>, fallback_name: &str) -> Result<Self, PdfError> {
        let (name, glyph_count) = {
            let face = ttf_parser::Face::parse(&data, 0).map_err(|e| {
                PdfError::engine(ErrorCode::Format, format!("cannot parse font: {e}"))
            })?;
            let name = face_name(&face, ttf_parser::name_id::POST_SCRIPT_NAME)
                .or_else(|| face_name(&face, ttf_parser::name_id::FULL_NAME))
                .unwrap_or_else(|| fallback_name.to_string());
            (name, u32::from(face.number_of_glyphs()))
        };
        Ok(Self {
            name,
            glyph_count,
            data: Some(data.into()),
        })
    }

    /// Read and parse a font file.
    ///
    /// # Errors
    ///
    /// Returns a `System` engine error if the file cannot be read, or a
    /// `Format` engine error if it is not a supported font.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            PdfError::engine(
                ErrorCode::System,
                format!("cannot open {}: {e}", path.display()),
            )
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(data, &stem)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    /// The font program, if the font was loaded from data.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

fn face_name(face: &ttf_parser::Face<'_>, id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == id)
        .find_map(|n| n.to_string())
        .filter(|s| !s.is_empty())
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("name", &self.name)
            .field("glyph_count", &self.glyph_count)
            .field("data_len", &self.data.as_ref().map(|d| d.len()))
            .finish()
    }
}

/// CJK character collection (`/CIDSystemInfo /Ordering`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CjkOrdering {
    /// Adobe-Japan1.
    Japan1,
    /// Adobe-GB1 (simplified Chinese).
    Gb1,
    /// Adobe-CNS1 (traditional Chinese).
    Cns1,
    /// Adobe-Korea1.
    Korea1,
}

impl CjkOrdering {
    /// Parse an `/Ordering` string.
    pub fn from_ordering(ordering: &str) -> Option<Self> {
        match ordering {
            "Japan1" => Some(CjkOrdering::Japan1),
            "GB1" => Some(CjkOrdering::Gb1),
            "CNS1" => Some(CjkOrdering::Cns1),
            "Korea1" => Some(CjkOrdering::Korea1),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CjkOrdering::Japan1 => "Japan1",
            CjkOrdering::Gb1 => "GB1",
            CjkOrdering::Cns1 => "CNS1",
            CjkOrdering::Korea1 => "Korea1",
        }
    }

    /// Script and BCP 47 language used when asking for a fallback font.
    pub fn script_and_language(self) -> (Script, &'static str) {
        match self {
            CjkOrdering::Japan1 => (Script::Kana, "ja"),
            CjkOrdering::Gb1 => (Script::Han, "zh-Hans"),
            CjkOrdering::Cns1 => (Script::Han, "zh-Hant"),
            CjkOrdering::Korea1 => (Script::Hangul, "ko"),
        }
    }
}

impl fmt::Display for CjkOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writing script a fallback font must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Script {
    Latin,
    Han,
    Kana,
    Hangul,
}

/// Arguments of `load_system_font`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRequest {
    pub name: String,
    pub bold: bool,
    pub italic: bool,
    pub needs_exact_metrics: bool,
}

/// Arguments of `load_system_cjk_font`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CjkRequest {
    pub name: String,
    pub ordering: CjkOrdering,
    pub serif: bool,
}

/// Arguments of `load_system_fallback_font`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRequest {
    pub script: Script,
    pub language: Option<String>,
    pub serif: bool,
    pub bold: bool,
    pub italic: bool,
}

/// A font resource used by a page.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageFont {
    /// Resource name in the page's `/Font` dictionary.
    pub resource: String,
    /// `/BaseFont` with any subset prefix removed.
    pub base_font: String,
    /// `/Subtype` (`Type1`, `TrueType`, `Type0`, ...).
    pub subtype: String,
    /// Whether a font program is embedded.
    pub embedded: bool,
    /// Character collection of a CID font.
    pub cjk: Option<CjkOrdering>,
    pub serif: bool,
    pub bold: bool,
    pub italic: bool,
}

impl PageFont {
    /// The request passed to `load_system_font` for this font.
    pub fn font_request(&self) -> FontRequest {
        FontRequest {
            name: self.base_font.clone(),
            bold: self.bold,
            italic: self.italic,
            needs_exact_metrics: false,
        }
    }

    /// The request passed to `load_system_cjk_font`, for CJK fonts.
    pub fn cjk_request(&self) -> Option<CjkRequest> {
        self.cjk.map(|ordering| CjkRequest {
            name: self.base_font.clone(),
            ordering,
            serif: self.serif,
        })
    }

    /// The request passed to `load_system_fallback_font`.
    pub fn fallback_request(&self) -> FallbackRequest {
        let (script, language) = match self.cjk {
            Some(ordering) => {
                let (script, language) = ordering.script_and_language();
                (script, Some(language.to_string()))
            }
            None => (Script::Latin, None),
        };
        FallbackRequest {
            script,
            language,
            serif: self.serif,
            bold: self.bold,
            italic: self.italic,
        }
    }
}

pub type LookupFn<R> = Box<dyn FnMut(&R) -> Result<Option<Font>, HandlerError>>;

/// A lookup handler and the signature it was declared with.
///
/// The engine checks the declared signature against the extension point
/// before every call; a mismatch fails the lookup without running it.
pub struct FontHook<R> {
    signature: Signature,
    lookup: LookupFn<R>,
}

impl<R> FontHook<R> {
    pub fn new(
        signature: impl Into<Signature>,
        f: impl FnMut(&R) -> Result<Option<Font>, HandlerError> + 'static,
    ) -> Self {
        Self {
            signature: signature.into(),
            lookup: Box::new(f),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn call(&mut self, request: &R) -> Result<Option<Font>, HandlerError> {
        (self.lookup)(request)
    }
}

impl<R> fmt::Debug for FontHook<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FontHook").field(&self.signature).finish()
    }
}

/// Handler set for the system-font extension points.
///
/// # Example
///
/// ```ignore
/// let replacement = Font::from_file("NimbusRoman-BoldItalic.otf")?;
/// let funcs = SystemFontFuncs::new().on_font(move |_req| Ok(Some(replacement.clone())));
/// context.install_system_font_funcs(funcs);
/// ```
#[derive(Default)]
pub struct SystemFontFuncs {
    font: Option<FontHook<FontRequest>>,
    cjk: Option<FontHook<CjkRequest>>,
    fallback: Option<FontHook<FallbackRequest>>,
}

impl SystemFontFuncs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the named-font lookup (builder pattern).
    pub fn on_font(
        self,
        f: impl FnMut(&FontRequest) -> Result<Option<Font>, HandlerError> + 'static,
    ) -> Self {
        self.with_font_hook(FontHook::new(LOAD_SYSTEM_FONT, f))
    }

    /// Set the CJK-font lookup (builder pattern).
    pub fn on_cjk(
        self,
        f: impl FnMut(&CjkRequest) -> Result<Option<Font>, HandlerError> + 'static,
    ) -> Self {
        self.with_cjk_hook(FontHook::new(LOAD_SYSTEM_CJK_FONT, f))
    }

    /// Set the fallback-font lookup (builder pattern).
    pub fn on_fallback(
        self,
        f: impl FnMut(&FallbackRequest) -> Result<Option<Font>, HandlerError> + 'static,
    ) -> Self {
        self.with_fallback_hook(FontHook::new(LOAD_SYSTEM_FALLBACK_FONT, f))
    }

    /// Set the named-font lookup with an explicit declared signature.
    pub fn with_font_hook(mut self, hook: FontHook<FontRequest>) -> Self {
        self.font = Some(hook);
        self
    }

    pub fn with_cjk_hook(mut self, hook: FontHook<CjkRequest>) -> Self {
        self.cjk = Some(hook);
        self
    }

    pub fn with_fallback_hook(mut self, hook: FontHook<FallbackRequest>) -> Self {
        self.fallback = Some(hook);
        self
    }

    pub fn font_mut(&mut self) -> Option<&mut FontHook<FontRequest>> {
        self.font.as_mut()
    }

    pub fn cjk_mut(&mut self) -> Option<&mut FontHook<CjkRequest>> {
        self.cjk.as_mut()
    }

    pub fn fallback_mut(&mut self) -> Option<&mut FontHook<FallbackRequest>> {
        self.fallback.as_mut()
    }
}

impl fmt::Debug for SystemFontFuncs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemFontFuncs")
            .field("font", &self.font.is_some())
            .field("cjk", &self.cjk.is_some())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_new_accessors() {
        let font = Font::new("NimbusRoman-BoldItalic", 855);
        assert_eq!(font.name(), "NimbusRoman-BoldItalic");
        assert_eq!(font.glyph_count(), 855);
        assert!(font.data().is_none());
    }

    #[test]
    fn from_bytes_rejects_non_font_data() {
        let err = Font::from_bytes(b"not a font".to_vec(), "x").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Format));
    }

    /// Smallest sfnt ttf-parser accepts: `head`, `hhea` and `maxp` for three
    /// glyphs, plus a one-record Windows `name` table when `name` is given.
    fn minimal_font(name: Option<(u16, &str)>) -> Vec<u8> {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());
        let mut hhea = vec![0u8; 36];
        hhea[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        hhea[34..36].copy_from_slice(&1u16.to_be_bytes());
        let mut maxp = 0x0000_5000u32.to_be_bytes().to_vec();
        maxp.extend(3u16.to_be_bytes());

        let mut tables: Vec<(&[u8; 4], Vec<u8>)> =
            vec![(b"head", head), (b"hhea", hhea), (b"maxp", maxp)];
        if let Some((name_id, text)) = name {
            let text: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
            let mut table = Vec::new();
            // format, count, storage offset, then platform, encoding,
            // language, name id, length, offset of the single record
            for field in [0, 1, 18, 3, 1, 0x0409, name_id, text.len() as u16, 0] {
                table.extend(field.to_be_bytes());
            }
            table.extend(text);
            tables.push((b"name", table));
        }

        let mut font = 0x0001_0000u32.to_be_bytes().to_vec();
        font.extend((tables.len() as u16).to_be_bytes());
        font.extend([0u8; 6]);
        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in &tables {
            font.extend_from_slice(&tag[..]);
            font.extend(0u32.to_be_bytes());
            font.extend((offset as u32).to_be_bytes());
            font.extend((data.len() as u32).to_be_bytes());
            offset += data.len();
        }
        for (_, data) in tables {
            font.extend(data);
        }
        font
    }

    #[test]
    fn from_bytes_reads_post_script_name() {
        let data = minimal_font(Some((ttf_parser::name_id::POST_SCRIPT_NAME, "TestSans-Bold")));
        let len = data.len();
        let font = Font::from_bytes(data, "ignored").unwrap();
        assert_eq!(font.name(), "TestSans-Bold");
        assert_eq!(font.glyph_count(), 3);
        assert_eq!(font.data().map(<[u8]>::len), Some(len));
    }

    #[test]
    fn from_bytes_falls_back_to_full_name_then_caller_name() {
        let data = minimal_font(Some((ttf_parser::name_id::FULL_NAME, "Test Sans Bold")));
        assert_eq!(Font::from_bytes(data, "ignored").unwrap().name(), "Test Sans Bold");

        let font = Font::from_bytes(minimal_font(None), "file-stem").unwrap();
        assert_eq!(font.name(), "file-stem");
        assert_eq!(font.glyph_count(), 3);
    }

    #[test]
    fn from_file_uses_stem_when_font_is_unnamed() {
        let path = std::env::temp_dir().join(format!("pdfbridge-unnamed-{}.ttf", std::process::id()));
        std::fs::write(&path, minimal_font(None)).unwrap();
        let font = Font::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            font.unwrap().name(),
            format!("pdfbridge-unnamed-{}", std::process::id())
        );
    }

    #[test]
    fn from_file_missing_is_system_error() {
        let err = Font::from_file("/nonexistent/dir/font.ttf").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::System));
    }

    #[test]
    fn cjk_ordering_round_trip() {
        for ordering in [
            CjkOrdering::Japan1,
            CjkOrdering::Gb1,
            CjkOrdering::Cns1,
            CjkOrdering::Korea1,
        ] {
            assert_eq!(CjkOrdering::from_ordering(ordering.as_str()), Some(ordering));
        }
        assert_eq!(CjkOrdering::from_ordering("Identity"), None);
    }

    #[test]
    fn cjk_script_mapping() {
        assert_eq!(
            CjkOrdering::Japan1.script_and_language(),
            (Script::Kana, "ja")
        );
        assert_eq!(
            CjkOrdering::Korea1.script_and_language(),
            (Script::Hangul, "ko")
        );
    }

    fn page_font(cjk: Option<CjkOrdering>) -> PageFont {
        PageFont {
            resource: "F1".into(),
            base_font: "MSMincho".into(),
            subtype: "Type0".into(),
            embedded: false,
            cjk,
            serif: true,
            bold: false,
            italic: true,
        }
    }

    #[test]
    fn page_font_requests() {
        let font = page_font(Some(CjkOrdering::Cns1));
        let req = font.font_request();
        assert_eq!(req.name, "MSMincho");
        assert!(req.italic);
        assert!(!req.needs_exact_metrics);

        let cjk = font.cjk_request().unwrap();
        assert_eq!(cjk.ordering, CjkOrdering::Cns1);
        assert!(cjk.serif);

        let fallback = font.fallback_request();
        assert_eq!(fallback.script, Script::Han);
        assert_eq!(fallback.language.as_deref(), Some("zh-Hant"));
    }

    #[test]
    fn latin_fallback_has_no_language() {
        let font = page_font(None);
        assert!(font.cjk_request().is_none());
        let fallback = font.fallback_request();
        assert_eq!(fallback.script, Script::Latin);
        assert_eq!(fallback.language, None);
    }

    #[test]
    fn funcs_builder_sets_entries() {
        let mut funcs = SystemFontFuncs::new().on_font(|req| Ok(Some(Font::new(&req.name, 1))));
        assert!(funcs.cjk_mut().is_none());
        assert!(funcs.fallback_mut().is_none());
        let hook = funcs.font_mut().unwrap();
        assert_eq!(hook.signature(), &LOAD_SYSTEM_FONT.to_signature());
        let font = hook.call(&FontRequest {
            name: "Helvetica".into(),
            bold: false,
            italic: false,
            needs_exact_metrics: false,
        })
        .unwrap()
        .unwrap();
        assert_eq!(font.name(), "Helvetica");
        assert_eq!(
            format!("{funcs:?}"),
            "SystemFontFuncs { font: true, cjk: false, fallback: false }"
        );
    }
}
