//! Support for Apple `.strings` tables.
//!
//! Tables are always regenerated from a translation section, so the writer is
//! the main entry point; the reader exists to inspect what was produced.

use std::{
    fmt::{Display, Formatter},
    io::{BufRead, Read, Write},
    str::FromStr,
};

use crate::{error::Error, traits::Parser, types::Section};

/// Byte encoding of a written `.strings` file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StringsEncoding {
    #[default]
    Utf8,
    /// Little-endian UTF-16 with a byte order mark.
    Utf16,
}

impl StringsEncoding {
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            StringsEncoding::Utf8 => text.as_bytes().to_vec(),
            StringsEncoding::Utf16 => {
                let mut bytes = Vec::with_capacity(2 + text.len() * 2);
                bytes.extend_from_slice(&[0xFF, 0xFE]);
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_le_bytes());
                }
                bytes
            }
        }
    }
}

impl Display for StringsEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StringsEncoding::Utf8 => write!(f, "utf-8"),
            StringsEncoding::Utf16 => write!(f, "utf-16"),
        }
    }
}

impl FromStr for StringsEncoding {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(StringsEncoding::Utf8),
            "utf-16" | "utf16" | "utf-16le" => Ok(StringsEncoding::Utf16),
            other => Err(Error::config(format!("unsupported .strings encoding `{other}`"))),
        }
    }
}

/// An Apple `.strings` table: ordered `"key" = "value";` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    pub pairs: Vec<Pair>,
}

/// A single key-value pair in a `.strings` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: String,
    pub value: String,
}

impl Format {
    /// Characters that may follow a backslash already present in a value.
    pub const KEPT_ESCAPES: &'static str = "\"\\nrtuU0";

    /// Builds a table from a translation section, keeping its order.
    pub fn from_section(section: &Section) -> Self {
        Format {
            pairs: section
                .iter()
                .map(|(key, value)| Pair {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Renders the table and encodes it for disk.
    pub fn encode(&self, encoding: StringsEncoding) -> Result<Vec<u8>, Error> {
        let text = String::from_utf8(self.to_bytes()?)
            .map_err(|e| Error::InvalidResource(e.to_string()))?;
        Ok(encoding.encode(&text))
    }
}

/// Escapes bare double quotes, line breaks and stray backslashes.
///
/// A backslash that already starts one of [`Format::KEPT_ESCAPES`] such as
/// `\n` or `\U2026` is left for the platform to interpret; any other
/// backslash is doubled so it cannot swallow the closing quote.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next_if(|next| Format::KEPT_ESCAPES.contains(*next)) {
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

impl Display for Pair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" = \"{}\";", escape(&self.key), escape(&self.value))
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// BOM-aware: UTF-16 tables are decoded, UTF-8 passes through.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let (text, _, malformed) = encoding_rs::UTF_8.decode(bytes);
        if malformed {
            return Err(Error::InvalidResource(
                ".strings file is not valid text".to_string(),
            ));
        }
        <Self as Parser>::from_str(&text)
    }

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut cursor = Cursor::new(s);
        let mut pairs = Vec::new();
        loop {
            cursor.skip_trivia()?;
            if cursor.peek().is_none() {
                break;
            }
            let key = cursor.quoted()?;
            cursor.skip_trivia()?;
            cursor.expect('=')?;
            cursor.skip_trivia()?;
            let value = cursor.quoted()?;
            cursor.skip_trivia()?;
            cursor.expect(';')?;
            pairs.push(Pair { key, value });
        }
        Ok(Format { pairs })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        for pair in &self.pairs {
            writeln!(writer, "{}", pair)?;
        }
        Ok(())
    }
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Cursor {
            chars: s.chars().peekable(),
            line: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn error(&self, message: &str) -> Error {
        Error::InvalidResource(format!("line {}: {}", self.line, message))
    }

    fn expect(&mut self, wanted: char) -> Result<(), Error> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            _ => Err(self.error(&format!("expected `{wanted}`"))),
        }
    }

    /// Skips whitespace and `//` / `/* */` comments.
    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') => {
                    self.bump();
                    match self.bump() {
                        Some('/') => while !matches!(self.bump(), Some('\n') | None) {},
                        Some('*') => {
                            let mut prev = '\0';
                            loop {
                                match self.bump() {
                                    Some('/') if prev == '*' => break,
                                    Some(c) => prev = c,
                                    None => return Err(self.error("unterminated comment")),
                                }
                            }
                        }
                        _ => return Err(self.error("stray `/`")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn quoted(&mut self) -> Result<String, Error> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Parser;
    use indoc::indoc;

    #[test]
    fn test_render_lines_in_section_order() {
        let mut section = Section::new();
        section.insert("zeta".to_string(), "Z".to_string());
        section.insert("alpha".to_string(), "A".to_string());
        let out = String::from_utf8(Format::from_section(&section).to_bytes().unwrap()).unwrap();
        assert_eq!(out, "\"zeta\" = \"Z\";\n\"alpha\" = \"A\";\n");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"Say "hi""#), r#"Say \"hi\""#);
        assert_eq!(escape(r#"already \"quoted\""#), r#"already \"quoted\""#);
        assert_eq!(escape("two\nlines"), r"two\nlines");
        assert_eq!(escape(r"keep \U2026"), r"keep \U2026");
        assert_eq!(escape(r"C:\"), r"C:\\");
        assert_eq!(escape(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_trailing_backslash_reads_back() {
        let mut section = Section::new();
        section.insert("path".to_string(), r"C:\".to_string());
        section.insert("next".to_string(), "ok".to_string());
        let rendered = Format::from_section(&section).to_bytes().unwrap();
        assert_eq!(
            String::from_utf8(rendered.clone()).unwrap(),
            "\"path\" = \"C:\\\\\";\n\"next\" = \"ok\";\n"
        );

        let parsed = Format::from_bytes(&rendered).unwrap();
        assert_eq!(parsed.get("path"), Some(r"C:\"));
        assert_eq!(parsed.get("next"), Some("ok"));
    }

    #[test]
    fn test_parse_with_comments() {
        let content = indoc! {r#"
            /* Greeting for the user */
            "hello" = "Hello, world!";
            // trailing comment
            "quote" = "Say \"hi\"";
        "#};
        let parsed = Format::from_str(content).unwrap();
        assert_eq!(parsed.pairs.len(), 2);
        assert_eq!(parsed.get("hello"), Some("Hello, world!"));
        assert_eq!(parsed.get("quote"), Some(r#"Say "hi""#));
    }

    #[test]
    fn test_round_trip_serialization() {
        let table = Format {
            pairs: vec![
                Pair {
                    key: "a".to_string(),
                    value: "multi\nline \"quoted\"".to_string(),
                },
                Pair {
                    key: "b = c".to_string(),
                    value: "semi;colon".to_string(),
                },
            ],
        };
        let reparsed = Format::from_bytes(&table.to_bytes().unwrap()).unwrap();
        assert_eq!(reparsed, table);
    }

    #[test]
    fn test_utf16_encoding_has_bom_and_reads_back() {
        let table = Format {
            pairs: vec![Pair {
                key: "title".to_string(),
                value: "Café".to_string(),
            }],
        };
        let bytes = table.encode(StringsEncoding::Utf16).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
        assert_eq!(Format::from_bytes(&bytes).unwrap(), table);
    }

    #[test]
    fn test_missing_semicolon_is_an_error() {
        assert!(Format::from_str(r#""a" = "b""#).is_err());
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!(StringsEncoding::from_str("UTF8").unwrap(), StringsEncoding::Utf8);
        assert_eq!(StringsEncoding::from_str("utf-16").unwrap(), StringsEncoding::Utf16);
        assert!(StringsEncoding::from_str("latin1").is_err());
    }
}
