//! Page link types.

use crate::Rect;

/// A link annotation on a page.
///
/// `uri` is the resolved target: an external URI for `/URI` actions, or
/// `#page=N` (1-based) for internal destinations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    /// Active area of the link in page space.
    pub rect: Rect,
    pub uri: String,
}

impl Link {
    pub fn new(rect: Rect, uri: impl Into<String>) -> Self {
        Self {
            rect,
            uri: uri.into(),
        }
    }

    /// Returns `true` if the link points inside the document.
    pub fn is_internal(&self) -> bool {
        self.uri.starts_with('#')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_link() {
        let link = Link::new(Rect::new(100.0, 200.0, 300.0, 220.0), "https://example.com");
        assert_eq!(link.uri, "https://example.com");
        assert!(!link.is_internal());
    }

    #[test]
    fn internal_link() {
        let link = Link::new(Rect::new(50.0, 100.0, 150.0, 120.0), "#page=3");
        assert!(link.is_internal());
        assert_eq!(link.rect.width(), 100.0);
    }
}
