//! Minimal markup tag scanner.
//!
//! Walks a document and yields start tags (including self-closing ones)
//! with their attributes, in document order. Comments, processing
//! instructions, declarations, CDATA sections and closing tags are skipped.
//! Character data between tags is ignored.
//!
//! Recovery rules:
//! - a start tag with a malformed attribute (no `=`, unquoted value) is
//!   dropped and scanning resumes after its closing `>`
//! - an unterminated construct (missing `>`, `-->`, closing quote, ...)
//!   ends the scan

/// A start tag read from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    /// Attribute names and entity-decoded values, in source order
    pub attributes: Vec<(&'a str, String)>,
}

impl Tag<'_> {
    /// First value of the named attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Iterator over the start tags of a document.
pub struct TagScanner<'a> {
    text: &'a str,
    pos: usize,
}

enum Parsed<'a> {
    Tag(Tag<'a>),
    Malformed,
    Unterminated,
}

impl<'a> TagScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Move past `terminator` searching from `from`, or to the end of input.
    fn skip_past(&mut self, from: usize, terminator: &str) -> bool {
        match self.text[from..].find(terminator) {
            Some(i) => {
                self.pos = from + i + terminator.len();
                true
            }
            None => {
                self.pos = self.text.len();
                false
            }
        }
    }

    fn skip_whitespace(&self, mut i: usize) -> usize {
        let bytes = self.text.as_bytes();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    }

    fn read_name(&self, start: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut i = start;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'/' | b'>' | b'=' | b'<')
        {
            i += 1;
        }
        i
    }

    /// Parse a start tag whose `<` is at `lt`. On success `self.pos` is
    /// moved past the closing `>`.
    fn parse_start_tag(&mut self, lt: usize) -> Parsed<'a> {
        let text = self.text;
        let bytes = text.as_bytes();

        let name_end = self.read_name(lt + 1);
        let name = &text[lt + 1..name_end];
        let mut attributes = Vec::new();
        let mut i = name_end;

        loop {
            i = self.skip_whitespace(i);
            match bytes.get(i) {
                None => return Parsed::Unterminated,
                Some(b'>') => {
                    self.pos = i + 1;
                    return Parsed::Tag(Tag { name, attributes });
                }
                Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                    self.pos = i + 2;
                    return Parsed::Tag(Tag { name, attributes });
                }
                Some(_) => {}
            }

            let attr_end = self.read_name(i);
            if attr_end == i {
                return self.recover(i);
            }
            let attr_name = &text[i..attr_end];

            i = self.skip_whitespace(attr_end);
            if bytes.get(i) != Some(&b'=') {
                return self.recover(i);
            }
            i = self.skip_whitespace(i + 1);

            let quote = match bytes.get(i) {
                Some(q @ (b'"' | b'\'')) => *q as char,
                None => return Parsed::Unterminated,
                Some(_) => return self.recover(i),
            };
            let value_start = i + 1;
            let Some(len) = text[value_start..].find(quote) else {
                return Parsed::Unterminated;
            };
            attributes.push((attr_name, decode_entities(&text[value_start..value_start + len])));
            i = value_start + len + 1;
        }
    }

    fn recover(&mut self, from: usize) -> Parsed<'a> {
        if self.skip_past(from, ">") {
            Parsed::Malformed
        } else {
            Parsed::Unterminated
        }
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        loop {
            let lt = self.pos + self.text[self.pos..].find('<')?;
            let rest = &self.text[lt..];

            let terminated = if rest.starts_with("<!--") {
                self.skip_past(lt + 4, "-->")
            } else if rest.starts_with("<![CDATA[") {
                self.skip_past(lt + 9, "]]>")
            } else if rest.starts_with("<?") {
                self.skip_past(lt + 2, "?>")
            } else if rest.starts_with("<!") || rest.starts_with("</") {
                self.skip_past(lt + 2, ">")
            } else if self.read_name(lt + 1) == lt + 1 {
                // Stray '<' in character data
                self.pos = lt + 1;
                true
            } else {
                match self.parse_start_tag(lt) {
                    Parsed::Tag(tag) => return Some(tag),
                    Parsed::Malformed => true,
                    Parsed::Unterminated => false,
                }
            };

            if !terminated {
                self.pos = self.text.len();
                return None;
            }
        }
    }
}

/// Decode the predefined XML entities and numeric character references.
/// Unknown or invalid references are kept verbatim.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let ch = match &tail[1..semi] {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                entity => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
