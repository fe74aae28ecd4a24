use crate::models::ParseEvent;
use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const READ_BUFFER_BYTES: usize = 1024 * 1024;

/// Streams a MediaWiki dump as [`ParseEvent`]s without buffering whole pages.
///
/// Self-closing elements are expanded into a start/end pair. End tags are not
/// checked against their start tags; nesting problems are left to the
/// consumer, which tolerates them.
pub struct WikiReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    done: bool,
}

impl WikiReader<Box<dyn BufRead>> {
    /// Opens a plain `.xml` dump, or a bzip2 stream when the path ends in `.bz2`.
    pub fn open(path: &str) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open wiki dump at: {}", path))?;
        let is_bz2 = Path::new(path)
            .extension()
            .map(|e| e == "bz2")
            .unwrap_or(false);

        let inner: Box<dyn BufRead> = if is_bz2 {
            Box::new(BufReader::with_capacity(
                READ_BUFFER_BYTES,
                BzDecoder::new(file),
            ))
        } else {
            Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, file))
        };

        Ok(Self::from_reader(inner))
    }
}

impl<R: BufRead> WikiReader<R> {
    pub fn from_reader(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.expand_empty_elements(true).check_end_names(false);
        Self {
            reader,
            buf: Vec::with_capacity(8192),
            done: false,
        }
    }

    fn next_event(&mut self) -> Result<Option<ParseEvent>> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .with_context(|| format!("Malformed XML near byte {}", position))?;

            let parsed = match event {
                Event::Start(ref e) => Some(element_start(e)?),
                Event::End(ref e) => Some(ParseEvent::ElementEnd {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                }),
                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .with_context(|| format!("Bad entity in text near byte {}", position))?;
                    Some(ParseEvent::Text(text.into_owned()))
                }
                Event::CData(e) => Some(ParseEvent::Text(
                    String::from_utf8_lossy(&e.into_inner()).into_owned(),
                )),
                Event::Eof => return Ok(None),
                _ => None,
            };

            if parsed.is_some() {
                return Ok(parsed);
            }
        }
    }
}

fn element_start(e: &BytesStart<'_>) -> Result<ParseEvent> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.with_context(|| format!("Bad attribute on <{}>", name))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .with_context(|| format!("Bad attribute value for {} on <{}>", key, name))?;
        attributes.push((key, value.into_owned()));
    }
    Ok(ParseEvent::ElementStart { name, attributes })
}

impl<R: BufRead> Iterator for WikiReader<R> {
    type Item = Result<ParseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
