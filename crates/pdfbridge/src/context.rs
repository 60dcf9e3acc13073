//! Engine context: the extension-point slots shared by every document.

use pdfbridge_core::bridge::{
    self, LOAD_SYSTEM_CJK_FONT, LOAD_SYSTEM_FALLBACK_FONT, LOAD_SYSTEM_FONT,
};
use pdfbridge_core::{
    CjkOrdering, CjkRequest, FallbackRequest, Font, FontRequest, PdfError, Script,
    SystemFontFuncs,
};
use tracing::debug;

/// Holds the handler sets installed for context-wide extension points.
///
/// With no handlers installed every lookup returns `Ok(None)`, which is the
/// engine's default behaviour.
///
/// # Example
///
/// ```ignore
/// let mut ctx = Context::new();
/// ctx.install_system_font_funcs(SystemFontFuncs::new().on_font(|req| {
///     Ok((req.name == "Times-Bold").then(|| replacement.clone()))
/// }));
/// let font = ctx.load_system_font("Times-Bold", true, false, false)?;
/// ctx.uninstall_system_font_funcs();
/// ```
#[derive(Debug, Default)]
pub struct Context {
    system_fonts: Option<SystemFontFuncs>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active system-font handlers.
    ///
    /// Returns the previously installed set, if any.
    pub fn install_system_font_funcs(&mut self, funcs: SystemFontFuncs) -> Option<SystemFontFuncs> {
        debug!(?funcs, "installing system font handlers");
        self.system_fonts.replace(funcs)
    }

    /// Restore the default (no lookup) behaviour.
    pub fn uninstall_system_font_funcs(&mut self) -> Option<SystemFontFuncs> {
        let previous = self.system_fonts.take();
        if previous.is_some() {
            debug!("uninstalled system font handlers");
        }
        previous
    }

    pub fn has_system_font_funcs(&self) -> bool {
        self.system_fonts.is_some()
    }

    /// Ask the installed handler for a font by name.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::HandlerInvocation`] if the handler fails or panics,
    /// or if its declared signature does not match `load_system_font`.
    pub fn load_system_font(
        &mut self,
        name: &str,
        bold: bool,
        italic: bool,
        needs_exact_metrics: bool,
    ) -> Result<Option<Font>, PdfError> {
        self.lookup_font(&FontRequest {
            name: name.to_string(),
            bold,
            italic,
            needs_exact_metrics,
        })
    }

    /// Ask the installed handler for a CJK font.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::HandlerInvocation`] if the handler fails or panics.
    pub fn load_system_cjk_font(
        &mut self,
        name: &str,
        ordering: CjkOrdering,
        serif: bool,
    ) -> Result<Option<Font>, PdfError> {
        self.lookup_cjk_font(&CjkRequest {
            name: name.to_string(),
            ordering,
            serif,
        })
    }

    /// Ask the installed handler for a font covering `script`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::HandlerInvocation`] if the handler fails or panics.
    pub fn load_system_fallback_font(
        &mut self,
        script: Script,
        language: Option<&str>,
        serif: bool,
        bold: bool,
        italic: bool,
    ) -> Result<Option<Font>, PdfError> {
        self.lookup_fallback_font(&FallbackRequest {
            script,
            language: language.map(str::to_string),
            serif,
            bold,
            italic,
        })
    }

    pub(crate) fn lookup_font(&mut self, request: &FontRequest) -> Result<Option<Font>, PdfError> {
        let Some(hook) = self.system_fonts.as_mut().and_then(|f| f.font_mut()) else {
            return Ok(None);
        };
        debug!(name = %request.name, bold = request.bold, italic = request.italic, "load_system_font");
        let declared = hook.signature().clone();
        bridge::invoke(&LOAD_SYSTEM_FONT.to_signature(), &declared, || hook.call(request))
    }

    pub(crate) fn lookup_cjk_font(
        &mut self,
        request: &CjkRequest,
    ) -> Result<Option<Font>, PdfError> {
        let Some(hook) = self.system_fonts.as_mut().and_then(|f| f.cjk_mut()) else {
            return Ok(None);
        };
        debug!(name = %request.name, ordering = %request.ordering, "load_system_cjk_font");
        let declared = hook.signature().clone();
        bridge::invoke(&LOAD_SYSTEM_CJK_FONT.to_signature(), &declared, || hook.call(request))
    }

    pub(crate) fn lookup_fallback_font(
        &mut self,
        request: &FallbackRequest,
    ) -> Result<Option<Font>, PdfError> {
        let Some(hook) = self.system_fonts.as_mut().and_then(|f| f.fallback_mut()) else {
            return Ok(None);
        };
        debug!(script = ?request.script, language = ?request.language, "load_system_fallback_font");
        let declared = hook.signature().clone();
        bridge::invoke(&LOAD_SYSTEM_FALLBACK_FONT.to_signature(), &declared, || hook.call(request))
    }
}
