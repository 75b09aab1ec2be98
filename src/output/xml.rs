//! Minimal structured XML writing
//!
//! All of the container's parts are emitted through this writer, so text
//! sanitization and escaping happen in exactly one place instead of at every
//! cell-emission site.

/// Removes characters that are not allowed in the container's markup:
/// control characters other than tab/CR/LF, and the 0xFFFE/0xFFFF
/// noncharacters.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&ch| {
            matches!(ch, '\t' | '\n' | '\r')
                || (!ch.is_control() && ch != '\u{FFFE}' && ch != '\u{FFFF}')
        })
        .collect()
}

/// Escapes the five XML-significant characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Append-only XML builder. Elements are written eagerly into one buffer;
/// the caller closes what it opens.
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<tag attr="..." ...>`
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.out.push('<');
        self.out.push_str(tag);
        self.push_attrs(attrs);
        self.out.push('>');
        self
    }

    /// `</tag>`
    pub fn close(&mut self, tag: &str) -> &mut Self {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        self
    }

    /// `<tag attr="..."/>`
    pub fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.out.push('<');
        self.out.push_str(tag);
        self.push_attrs(attrs);
        self.out.push_str("/>");
        self
    }

    /// `<tag attr="...">sanitized-and-escaped text</tag>`
    pub fn leaf(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> &mut Self {
        self.open(tag, attrs);
        self.out.push_str(&escape(&sanitize(text)));
        self.close(tag)
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn push_attrs(&mut self, attrs: &[(&str, &str)]) {
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape(&sanitize(value)));
            self.out.push('"');
        }
    }
}
