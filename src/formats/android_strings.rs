//! Support for Android `strings.xml` resource files.
//!
//! `<string>` elements are parsed into [`StringResource`]s. Any other child of
//! `<resources>` (`<plurals>`, `<string-array>`, comments, ...) is kept
//! verbatim and written back after the strings, so merging never drops
//! hand-written resources.

use quick_xml::{
    Reader, Writer,
    escape::{partial_escape, unescape},
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::io::{BufRead, Read, Write};

use crate::{error::Error, traits::Parser};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    pub strings: Vec<StringResource>,
    /// Non-`<string>` children of `<resources>` and comments, as raw XML.
    pub passthrough: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringResource {
    pub name: String,
    pub value: StringValue,
    /// Attributes other than `name`, in document order.
    pub attributes: Vec<(String, String)>,
}

/// Content of a `<string>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringValue {
    /// Plain text, stored unescaped.
    Text(String),
    /// Inner XML containing markup or CDATA, stored exactly as read.
    Markup(String),
}

impl StringValue {
    /// The text as it appears between the tags, unescaped when plain.
    pub fn as_str(&self) -> &str {
        match self {
            StringValue::Text(text) | StringValue::Markup(text) => text,
        }
    }
}

impl StringResource {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        StringResource {
            name: name.into(),
            value: StringValue::Text(value.into()),
            attributes: Vec::new(),
        }
    }
}

impl Format {
    pub fn find(&self, name: &str) -> Option<&StringResource> {
        self.strings.iter().find(|s| s.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut StringResource> {
        self.strings.iter_mut().find(|s| s.name == name)
    }

    /// Overwrites the value of `name` in place, or appends a new entry.
    pub fn upsert(&mut self, name: &str, value: String) {
        match self.find_mut(name) {
            Some(existing) => existing.value = StringValue::Text(value),
            None => self.strings.push(StringResource::new(name, value)),
        }
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        <Self as Parser>::from_str(&content)
    }

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut xml_reader = Reader::from_str(s);
        xml_reader.config_mut().trim_text(true);

        let mut format = Format::default();
        let mut in_resources = false;

        loop {
            let start = xml_reader.buffer_position() as usize;
            match xml_reader.read_event()? {
                Event::Start(e) if !in_resources => {
                    expect_resources_root(&e)?;
                    in_resources = true;
                }
                Event::Empty(e) if !in_resources => {
                    expect_resources_root(&e)?;
                }
                Event::Start(e) if e.name().as_ref() == b"string" => {
                    let mut resource = parse_attributes(&e)?;
                    let span = xml_reader.read_to_end(e.name())?;
                    let inner = &s[span.start as usize..span.end as usize];
                    resource.value = if inner.contains('<') {
                        StringValue::Markup(inner.to_string())
                    } else {
                        StringValue::Text(
                            unescape(inner)
                                .map_err(|err| Error::XmlParse(err.into()))?
                                .into_owned(),
                        )
                    };
                    format.strings.push(resource);
                }
                Event::Empty(e) if e.name().as_ref() == b"string" => {
                    format.strings.push(parse_attributes(&e)?);
                }
                Event::Start(e) => {
                    xml_reader.read_to_end(e.name())?;
                    let end = xml_reader.buffer_position() as usize;
                    format.passthrough.push(s[start..end].trim().to_string());
                }
                Event::Empty(_) | Event::Comment(_) if in_resources => {
                    let end = xml_reader.buffer_position() as usize;
                    format.passthrough.push(s[start..end].trim().to_string());
                }
                Event::End(_) => in_resources = false,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(format)
    }

    /// Writes the document tab-indented, strings first, then passthrough elements.
    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml_writer = Writer::new_with_indent(&mut writer, b'\t', 1);

        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        xml_writer.write_event(Event::Start(BytesStart::new("resources")))?;

        for sr in &self.strings {
            let mut elem = BytesStart::new("string");
            elem.push_attribute(("name", sr.name.as_str()));
            for (key, value) in &sr.attributes {
                elem.push_attribute((key.as_str(), value.as_str()));
            }
            let text = match &sr.value {
                StringValue::Text(text) => BytesText::from_escaped(partial_escape(text)),
                StringValue::Markup(raw) => BytesText::from_escaped(raw.as_str()),
            };
            xml_writer.write_event(Event::Start(elem))?;
            xml_writer.write_event(Event::Text(text))?;
            xml_writer.write_event(Event::End(BytesEnd::new("string")))?;
        }

        for raw in &self.passthrough {
            xml_writer.write_event(Event::Text(BytesText::from_escaped(format!("\n\t{raw}"))))?;
        }
        if !self.passthrough.is_empty() {
            xml_writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new("resources")))?;
        xml_writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
        Ok(())
    }
}

fn expect_resources_root(e: &BytesStart) -> Result<(), Error> {
    if e.name().as_ref() == b"resources" {
        Ok(())
    } else {
        Err(Error::InvalidResource(format!(
            "expected <resources> root, found <{}>",
            String::from_utf8_lossy(e.name().as_ref())
        )))
    }
}

fn parse_attributes(e: &BytesStart) -> Result<StringResource, Error> {
    let mut name = None;
    let mut attributes = Vec::new();

    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let value = attr.unescape_value()?.to_string();
        match attr.key.as_ref() {
            b"name" => name = Some(value),
            key => attributes.push((String::from_utf8_lossy(key).into_owned(), value)),
        }
    }
    let name =
        name.ok_or_else(|| Error::InvalidResource("string tag missing 'name'".to_string()))?;

    Ok(StringResource {
        name,
        value: StringValue::Text(String::new()),
        attributes,
    })
}
