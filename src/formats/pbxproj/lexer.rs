//! Parser for old-style property lists as written by Xcode.

use std::collections::HashMap;

use super::{Dict, Value};
use crate::error::Error;

/// Parses a manifest into its root dictionary and the reference comments
/// that directly follow bare identifiers (`ID /* comment */`).
pub(super) fn parse(src: &str) -> Result<(Dict, HashMap<String, String>), Error> {
    let mut lexer = Lexer {
        src,
        pos: 0,
        last_bare: None,
        comments: HashMap::new(),
    };
    lexer.skip_trivia()?;
    let root = match lexer.value()? {
        Value::Dict(dict) => dict,
        _ => return Err(lexer.error("root value must be a dictionary")),
    };
    lexer.skip_trivia()?;
    if lexer.pos != src.len() {
        return Err(lexer.error("unexpected content after root dictionary"));
    }
    Ok((root, lexer.comments))
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    last_bare: Option<String>,
    comments: HashMap<String, String>,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: &str) -> Error {
        let line = self.src[..self.pos.min(self.src.len())]
            .bytes()
            .filter(|b| *b == b'\n')
            .count()
            + 1;
        Error::manifest_parse(format!("line {line}: {message}"))
    }

    fn expect(&mut self, wanted: u8) -> Result<(), Error> {
        if self.peek() == Some(wanted) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected `{}`", wanted as char)))
        }
    }

    /// Skips whitespace and comments. A block comment on the same line as the
    /// preceding bare identifier is recorded as that identifier's comment.
    fn skip_trivia(&mut self) -> Result<(), Error> {
        let mut owner = self.last_bare.take();
        loop {
            let rest = &self.src[self.pos..];
            match self.peek() {
                Some(b'\n') => {
                    owner = None;
                    self.pos += 1;
                }
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if rest.starts_with("/*") => {
                    let end = rest[2..]
                        .find("*/")
                        .ok_or_else(|| self.error("unterminated comment"))?;
                    let comment = rest[2..2 + end].trim().to_string();
                    if let Some(owner) = owner.take() {
                        self.comments.entry(owner).or_insert(comment);
                    }
                    self.pos += 2 + end + 2;
                }
                Some(b'/') if rest.starts_with("//") => {
                    owner = None;
                    self.pos += rest.find('\n').unwrap_or(rest.len());
                }
                _ => return Ok(()),
            }
        }
    }

    fn value(&mut self) -> Result<Value, Error> {
        match self.peek() {
            Some(b'{') => self.dict(),
            Some(b'(') => self.array(),
            Some(_) => self.string().map(Value::String),
            None => Err(self.error("unexpected end of file")),
        }
    }

    fn dict(&mut self) -> Result<Value, Error> {
        self.expect(b'{')?;
        let mut dict = Dict::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Dict(dict));
            }
            let key = self.string()?;
            self.skip_trivia()?;
            self.expect(b'=')?;
            self.skip_trivia()?;
            let value = self.value()?;
            self.skip_trivia()?;
            self.expect(b';')?;
            dict.insert(key, value);
        }
    }

    fn array(&mut self) -> Result<Value, Error> {
        self.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {}
                _ => return Err(self.error("expected `,` or `)`")),
            }
        }
    }

    fn string(&mut self) -> Result<String, Error> {
        if self.peek() == Some(b'"') {
            return self.quoted();
        }
        let start = self.pos;
        while self.peek().is_some_and(is_bare_byte) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a value"));
        }
        let bare = self.src[start..self.pos].to_string();
        self.last_bare = Some(bare.clone());
        Ok(bare)
    }

    fn quoted(&mut self) -> Result<String, Error> {
        self.expect(b'"')?;
        let bytes = self.src.as_bytes();
        let mut out = Vec::new();
        loop {
            let Some(&b) = bytes.get(self.pos) else {
                return Err(self.error("unterminated string"));
            };
            self.pos += 1;
            match b {
                b'"' => break,
                b'\\' => {
                    let Some(&escaped) = bytes.get(self.pos) else {
                        return Err(self.error("unterminated string"));
                    };
                    self.pos += 1;
                    out.push(match escaped {
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'r' => b'\r',
                        other => other,
                    });
                }
                b => out.push(b),
            }
        }
        String::from_utf8(out).map_err(|_| self.error("string is not valid UTF-8"))
    }
}

fn is_bare_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b >= 0x80 || b"_$/:.-+<>@~".contains(&b)
}
