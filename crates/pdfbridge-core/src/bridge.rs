//! Invocation of caller-supplied handlers from inside engine operations.
//!
//! Every extension point has a fixed [`Signature`]: a handler name and the
//! ordered parameter names the engine passes. Handlers declare their own
//! signature; [`invoke`] checks the two agree before calling the handler,
//! runs it with panics contained, and turns every failure into
//! [`PdfError::HandlerInvocation`] carrying the original message.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::{HandlerError, PdfError};

/// Name and ordered parameter names of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    name: Cow<'static, str>,
    params: Vec<Cow<'static, str>>,
}

impl Signature {
    /// Signature with static parameter names.
    pub const fn fixed(name: &'static str, params: &'static [&'static str]) -> FixedSignature {
        FixedSignature { name, params }
    }

    pub fn new<N, P, I>(name: N, params: I) -> Self
    where
        N: Into<Cow<'static, str>>,
        P: Into<Cow<'static, str>>,
        I: IntoIterator<Item = P>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> impl ExactSizeIterator<Item = &str> {
        self.params.iter().map(|p| p.as_ref())
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Same parameters under a different handler name.
    pub fn renamed(&self, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            params: self.params.clone(),
        }
    }

    /// Append a parameter (builder pattern).
    pub fn with_param(mut self, param: impl Into<Cow<'static, str>>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Check that a handler declared as `self` can be called with the
    /// arguments of `expected`.
    ///
    /// The message names the handler, in the form
    /// `name() missing 1 required positional argument: 'x'` or
    /// `name() takes 2 positional arguments but 3 were given`.
    pub fn check_call(&self, expected: &Signature) -> Result<(), String> {
        let declared = self.arity();
        let given = expected.arity();
        if declared > given {
            let missing: Vec<String> = self.params[given..]
                .iter()
                .map(|p| format!("'{p}'"))
                .collect();
            let noun = if missing.len() == 1 {
                "argument"
            } else {
                "arguments"
            };
            return Err(format!(
                "{}() missing {} required positional {noun}: {}",
                self.name,
                missing.len(),
                join_names(&missing)
            ));
        }
        if declared < given {
            let noun = if declared == 1 {
                "argument"
            } else {
                "arguments"
            };
            let verb = if given == 1 { "was" } else { "were" };
            return Err(format!(
                "{}() takes {declared} positional {noun} but {given} {verb} given",
                self.name
            ));
        }
        Ok(())
    }
}

/// `'a'`, `'a' and 'b'`, `'a', 'b', and 'c'`.
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(p)?;
        }
        f.write_str(")")
    }
}

/// A `const`-constructible signature, used for the engine's extension
/// points.
#[derive(Debug, Clone, Copy)]
pub struct FixedSignature {
    name: &'static str,
    params: &'static [&'static str],
}

impl FixedSignature {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn to_signature(&self) -> Signature {
        Signature::new(self.name, self.params.iter().copied())
    }
}

impl From<FixedSignature> for Signature {
    fn from(fixed: FixedSignature) -> Self {
        fixed.to_signature()
    }
}

/// Extension point: filter factory, called once per content stream.
pub const FILTER_FACTORY: FixedSignature = Signature::fixed(
    "filter_factory",
    &["doc", "chain", "struct_parents", "transform", "options"],
);

/// Extension point: per-item content filter.
pub const CONTENT_FILTER: FixedSignature = Signature::fixed("content_filter", &["ctx", "item"]);

/// Extension point: named system font lookup.
pub const LOAD_SYSTEM_FONT: FixedSignature = Signature::fixed(
    "load_system_font",
    &["name", "bold", "italic", "needs_exact_metrics"],
);

/// Extension point: CJK system font lookup.
pub const LOAD_SYSTEM_CJK_FONT: FixedSignature =
    Signature::fixed("load_system_cjk_font", &["name", "ordering", "serif"]);

/// Extension point: script-based fallback font lookup.
pub const LOAD_SYSTEM_FALLBACK_FONT: FixedSignature = Signature::fixed(
    "load_system_fallback_font",
    &["script", "language", "serif", "bold", "italic"],
);

/// Call a handler declared as `declared` at an extension point expecting
/// `expected`.
///
/// The handler does not run when the signatures disagree. A returned
/// [`HandlerError`] or a panic inside `f` is converted to
/// [`PdfError::HandlerInvocation`] with the original text.
pub fn invoke<R>(
    expected: &Signature,
    declared: &Signature,
    f: impl FnOnce() -> Result<R, HandlerError>,
) -> Result<R, PdfError> {
    if let Err(message) = declared.check_call(expected) {
        return Err(PdfError::handler(declared.name(), message));
    }
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(PdfError::handler(declared.name(), err.message())),
        Err(payload) => Err(PdfError::handler(
            declared.name(),
            panic_message(payload.as_ref()),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
