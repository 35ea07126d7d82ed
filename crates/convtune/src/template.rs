use std::error::Error;
use std::fmt::{self, Display};

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

/// A source text with named `<%TOKEN%>` placeholders.
///
/// Substitution is exact text replacement: values are spliced verbatim,
/// with no pattern-language interpretation on either side. Passes may be
/// applied iteratively, and a fragment produced by one pass may itself
/// carry placeholders resolved by a later pass; [`Template::into_source`]
/// is the point where every placeholder must finally be gone.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Replace every occurrence of `<%name%>` with `value`.
    pub fn bind(mut self, name: &str, value: &str) -> Self {
        let token = format!("{OPEN}{name}{CLOSE}");
        self.text = self.text.replace(&token, value);
        self
    }

    /// Finish substitution without checking for leftover placeholders.
    ///
    /// For intermediate fragments that intentionally keep placeholders
    /// for a later pass.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Finish substitution, failing if any placeholder survives.
    pub fn into_source(self) -> Result<String, TemplateError> {
        match self.text.find(OPEN) {
            Some(open) => {
                let rest = &self.text[open + OPEN.len()..];
                let name = match rest.find(CLOSE) {
                    Some(close) => rest[..close].to_string(),
                    None => rest.to_string(),
                };
                Err(TemplateError::Unresolved { name })
            }
            None => Ok(self.text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder survived every substitution pass.
    Unresolved { name: String },
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Unresolved { name } => {
                write!(f, "unresolved placeholder <%{name}%>")
            }
        }
    }
}

impl Error for TemplateError {}
