use serde::{Deserialize, Serialize};

/// Text formatting marks. Non-exclusive: an inline may carry any subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMark {
    Bold,
    Italic,
    Underline,
    Strike,
    Highlight,
    Code,
    Subscript,
    Superscript,
}

impl TextMark {
    /// Wire name of the mark
    pub fn as_str(&self) -> &'static str {
        match self {
            TextMark::Bold => "bold",
            TextMark::Italic => "italic",
            TextMark::Underline => "underline",
            TextMark::Strike => "strike",
            TextMark::Highlight => "highlight",
            TextMark::Code => "code",
            TextMark::Subscript => "subscript",
            TextMark::Superscript => "superscript",
        }
    }

    /// Parse a wire mark name; `None` for names outside the closed set
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "bold" => TextMark::Bold,
            "italic" => TextMark::Italic,
            "underline" => TextMark::Underline,
            "strike" => TextMark::Strike,
            "highlight" => TextMark::Highlight,
            "code" => TextMark::Code,
            "subscript" => TextMark::Subscript,
            "superscript" => TextMark::Superscript,
            _ => return None,
        })
    }
}

/// Hyperlink target attached to an inline span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<LinkTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkTarget {
    #[serde(rename = "_blank")]
    NewTab,
    #[serde(rename = "_self")]
    SameTab,
}

/// Side-note attached to an inline span (review comment, AI provenance tag)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "authorId")]
    pub author_id: String,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
}

/// Smallest addressable text span inside a text-bearing block.
///
/// Inlines are flat, not nested: styling is expressed through the `marks`
/// set, so concatenating a block's inline texts in order reconstructs its
/// plain-text content deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<TextMark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl Inline {
    /// Plain text inline with no marks
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            marks: Vec::new(),
            link: None,
            annotation: None,
        }
    }

    /// Linked inline span
    pub fn linked(id: impl Into<String>, text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link: Some(Link {
                url: url.into(),
                title: None,
                target: None,
            }),
            ..Self::text(id, text)
        }
    }

    pub fn has_mark(&self, mark: TextMark) -> bool {
        self.marks.contains(&mark)
    }

    /// Add a mark. Idempotent: adding a present mark is a no-op.
    pub fn add_mark(&mut self, mark: TextMark) {
        if !self.has_mark(mark) {
            self.marks.push(mark);
        }
    }

    /// Remove a mark. Idempotent: removing an absent mark is a no-op.
    pub fn remove_mark(&mut self, mark: TextMark) {
        self.marks.retain(|m| *m != mark);
    }
}

/// Concatenate an inline sequence into the block's plain-text content
pub fn plain_text(inlines: &[Inline]) -> String {
    inlines.iter().map(|i| i.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_concatenation_is_order_preserving() {
        let inlines = vec![Inline::text("i1", "ESG "), Inline::text("i2", "Report")];
        assert_eq!(plain_text(&inlines), "ESG Report");
    }

    #[test]
    fn test_plain_text_ignores_marks_and_links() {
        let mut a = Inline::text("i1", "Scope 3 ");
        a.add_mark(TextMark::Bold);
        let b = Inline::linked("i2", "emissions", "https://example.com/ghg");

        assert_eq!(plain_text(&[a, b]), "Scope 3 emissions");
    }

    #[test]
    fn test_mark_operations_are_idempotent() {
        let mut inline = Inline::text("i1", "hello");

        inline.add_mark(TextMark::Bold);
        inline.add_mark(TextMark::Bold);
        assert_eq!(inline.marks, vec![TextMark::Bold]);

        inline.remove_mark(TextMark::Italic);
        assert_eq!(inline.marks, vec![TextMark::Bold]);

        inline.remove_mark(TextMark::Bold);
        inline.remove_mark(TextMark::Bold);
        assert!(inline.marks.is_empty());
    }

    #[test]
    fn test_mark_wire_names_round_trip() {
        for mark in [
            TextMark::Bold,
            TextMark::Italic,
            TextMark::Underline,
            TextMark::Strike,
            TextMark::Highlight,
            TextMark::Code,
            TextMark::Subscript,
            TextMark::Superscript,
        ] {
            assert_eq!(TextMark::parse(mark.as_str()), Some(mark));
        }
        assert_eq!(TextMark::parse("blink"), None);
    }
}
