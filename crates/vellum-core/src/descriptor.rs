//! The descriptor document instructing the engine which transform to run.

use crate::vfs::layout;
use crate::xml::escape_xml;

/// Parameters for one engine invocation, serialized to XML and written
/// to [`layout::DESCRIPTOR_PATH`] before calling the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionParameters {
    /// Virtual path of the input document.
    pub source: String,

    /// Virtual path the engine writes the converted binary to.
    pub destination: String,

    /// Theme directory for presentation rendering.
    pub theme_dir: String,

    /// Base64-inlining stays disabled; the pipeline reads raw output
    /// bytes back itself.
    pub no_base64: bool,

    /// Format-specific flags. No currently supported format sets any;
    /// the element stays in the contract for forward compatibility.
    pub options: Vec<(String, String)>,
}

impl ConversionParameters {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            theme_dir: layout::THEMES_DIR.to_string(),
            no_base64: false,
            options: Vec::new(),
        }
    }

    /// Override the theme directory.
    pub fn with_theme_dir(mut self, theme_dir: impl Into<String>) -> Self {
        self.theme_dir = theme_dir.into();
        self
    }

    /// Attach a format-specific flag.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }

    /// Serialize to the descriptor markup.
    pub fn to_xml(&self) -> String {
        let mut descriptor = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        descriptor.push_str("<TaskDescriptor>");
        descriptor.push_str(&format!("<Source>{}</Source>", escape_xml(&self.source)));
        descriptor.push_str(&format!(
            "<Target>{}</Target>",
            escape_xml(&self.destination)
        ));
        descriptor.push_str(&format!(
            "<ThemeDir>{}</ThemeDir>",
            escape_xml(&self.theme_dir)
        ));
        descriptor.push_str(&format!("<NoBase64>{}</NoBase64>", self.no_base64));
        descriptor.push_str("<Options>");
        for (name, value) in &self.options {
            descriptor.push_str(&format!(
                r#"<Option name="{}">{}</Option>"#,
                escape_xml(name),
                escape_xml(value)
            ));
        }
        descriptor.push_str("</Options>");
        descriptor.push_str("</TaskDescriptor>");
        descriptor
    }
}
