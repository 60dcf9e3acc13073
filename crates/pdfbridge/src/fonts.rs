//! Resolution of a page's fonts through the context's font hooks.

use pdfbridge_core::{Font, PageFont, PdfError};
use tracing::debug;

use crate::Context;

/// Where the font used for a [`PageFont`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSource {
    /// The document embeds the font program.
    Embedded,
    /// Returned by the named or CJK system-font hook.
    System,
    /// Returned by the fallback hook.
    Fallback,
    /// No hook provided a font.
    Unresolved,
}

/// Outcome of resolving one page font.
#[derive(Debug, Clone, PartialEq)]
pub struct FontResolution {
    pub font: PageFont,
    pub source: FontSource,
    /// The font a hook returned, if any.
    pub loaded: Option<Font>,
}

/// Resolve each non-embedded font: the CJK hook for CID fonts with a known
/// collection, the named hook otherwise, then the fallback hook.
pub(crate) fn resolve_fonts(
    ctx: &mut Context,
    fonts: Vec<PageFont>,
) -> Result<Vec<FontResolution>, PdfError> {
    let mut out = Vec::with_capacity(fonts.len());
    for font in fonts {
        if font.embedded {
            out.push(FontResolution {
                font,
                source: FontSource::Embedded,
                loaded: None,
            });
            continue;
        }

        let primary = match font.cjk_request() {
            Some(request) => ctx.lookup_cjk_font(&request)?,
            None => ctx.lookup_font(&font.font_request())?,
        };
        let (source, loaded) = match primary {
            Some(found) => (FontSource::System, Some(found)),
            None => match ctx.lookup_fallback_font(&font.fallback_request())? {
                Some(found) => (FontSource::Fallback, Some(found)),
                None => (FontSource::Unresolved, None),
            },
        };
        debug!(font = %font.base_font, ?source, "resolved page font");
        out.push(FontResolution {
            font,
            source,
            loaded,
        });
    }
    Ok(out)
}
