use crate::{Context, Result, truncate_long};
use std::fmt::{self, Display};

/// XML document stored as text.
///
/// The markup must be well formed, the text is kept verbatim.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlDocument(String);

impl XmlDocument {
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if let Err(error) = roxmltree::Document::parse(&text).with_context(|| {
            format!(
                "Cannot load `{}` as a xml document",
                truncate_long!(text.trim())
            )
        }) {
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
