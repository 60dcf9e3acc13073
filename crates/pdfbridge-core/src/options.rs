/// Options for opening a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenOptions {
    /// Password tried immediately after loading an encrypted document.
    pub password: Option<String>,
    /// Reject inputs larger than this many bytes.
    pub max_input_bytes: Option<usize>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the password (builder pattern).
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the input size limit (builder pattern).
    pub fn max_input_bytes(mut self, limit: usize) -> Self {
        self.max_input_bytes = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_limits() {
        let opts = OpenOptions::default();
        assert!(opts.password.is_none());
        assert!(opts.max_input_bytes.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let opts = OpenOptions::new().password("secret").max_input_bytes(1024);
        assert_eq!(opts.password.as_deref(), Some("secret"));
        assert_eq!(opts.max_input_bytes, Some(1024));
    }
}
