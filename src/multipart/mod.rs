//! Multipart form decoding.
//!
//! Turns a base64-encoded request body plus its declared content-type into
//! a [`DecodedForm`]: named text values and named file parts. The decoder
//! enforces an additive in-memory budget on part content and never
//! truncates silently; an over-budget form is rejected outright.
//!
//! Parsing follows the multipart/form-data wire format: parts are split at
//! `--boundary` delimiters found at line starts, each part carries its own
//! header block terminated by a blank line, and the final delimiter ends
//! with `--`. A part whose `Content-Disposition` carries a `filename`
//! parameter becomes a [`FilePart`] (even when the filename is empty,
//! which browsers send for an unused upload slot); a part without one
//! becomes a text value.

use std::collections::HashMap;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::errors::{RelayError, RelayResult};
use crate::types::SubmissionRequest;

/// Maximum number of parts accepted in one form.
pub const MAX_PARTS: usize = 1000;

/// Maximum boundary length permitted by RFC 2046.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// A decoded multipart form: text values and file parts by field name.
///
/// Created once per request, read-only afterward, discarded with the
/// request. Values and files keep their submission order within a field.
#[derive(Debug, Default)]
pub struct DecodedForm {
    values: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<FilePart>>,
}

impl DecodedForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text value under a field name.
    pub fn push_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Appends a file part under a field name.
    pub fn push_file(&mut self, name: impl Into<String>, file: FilePart) {
        self.files.entry(name.into()).or_default().push(file);
    }

    /// Returns the text values submitted under a field name.
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns all values for a field joined with newlines.
    ///
    /// A field that was never submitted joins to the empty string.
    pub fn joined(&self, name: &str) -> String {
        self.values(name).join("\n")
    }

    /// Returns the file parts submitted under a field name.
    pub fn files(&self, name: &str) -> &[FilePart] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the number of text values across all fields.
    pub fn value_count(&self) -> usize {
        self.values.values().map(Vec::len).sum()
    }

    /// Returns the number of file parts across all fields.
    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

/// One uploaded file from a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl FilePart {
    /// Creates a file part from a filename and its content.
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data,
        }
    }

    /// Sets the content type declared by the submitting form.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the filename as submitted. May be empty, meaning the
    /// upload slot was present but unused.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the content type declared by the submitting form, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns true if the part carries an actual attachment.
    pub fn is_attached(&self) -> bool {
        !self.filename.is_empty()
    }

    /// Opens the file content as a byte stream.
    pub fn open(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.data)
    }

    /// Returns the content length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Extracts the boundary token from a content-type header value.
///
/// The value must parse as a MIME media type with primary type
/// `multipart` and carry a boundary parameter; anything else is a format
/// error.
pub fn boundary_from_content_type(value: &str) -> RelayResult<String> {
    let media_type: mime::Mime = value
        .parse()
        .map_err(|err| RelayError::format("content-type is not a valid media type").with_cause(err))?;

    if media_type.type_() != mime::MULTIPART {
        return Err(RelayError::format(format!(
            "expected a multipart payload, got {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    let boundary = media_type
        .get_param(mime::BOUNDARY)
        .ok_or_else(|| RelayError::format("content-type is missing its boundary parameter"))?
        .as_str()
        .to_string();

    if boundary.is_empty() {
        return Err(RelayError::format("boundary parameter is empty"));
    }
    if boundary.len() > MAX_BOUNDARY_LEN {
        return Err(RelayError::format("boundary parameter is too long"));
    }

    Ok(boundary)
}

/// Decodes base64 multipart request bodies into [`DecodedForm`]s.
#[derive(Debug, Clone)]
pub struct FormDecoder {
    budget: usize,
}

impl FormDecoder {
    /// Creates a decoder with the given in-memory budget for part content.
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Decodes a submission request into a form.
    pub fn decode(&self, request: &SubmissionRequest) -> RelayResult<DecodedForm> {
        let content_type = request
            .content_type()
            .ok_or_else(|| RelayError::format("request has no content-type header"))?;
        let boundary = boundary_from_content_type(content_type)?;

        let raw = BASE64
            .decode(request.body.as_bytes())
            .map_err(|err| RelayError::decode("request body is not valid base64").with_cause(err))?;

        self.parse_parts(&raw, &boundary)
    }

    /// Splits a decoded multipart body into its parts.
    pub fn parse_parts(&self, data: &[u8], boundary: &str) -> RelayResult<DecodedForm> {
        let delimiter = format!("--{boundary}").into_bytes();
        let mut form = DecodedForm::new();
        let mut total = 0usize;
        let mut parts = 0usize;

        let mut pos = find_delimiter(data, &delimiter, 0)
            .ok_or_else(|| RelayError::decode("multipart body has no boundary delimiter"))?;

        loop {
            let after = pos + delimiter.len();
            if data[after..].starts_with(b"--") {
                // Terminal delimiter; any epilogue is ignored.
                return Ok(form);
            }
            if !data[after..].starts_with(b"\r\n") {
                return Err(RelayError::decode("malformed boundary line"));
            }
            let part_start = after + 2;

            let next = find_delimiter(data, &delimiter, part_start).ok_or_else(|| {
                RelayError::decode("multipart body is missing its terminating delimiter")
            })?;
            // Delimiters sit at line starts, so the two bytes before the
            // next one are the CRLF closing this part's content.
            if next < part_start + 2 {
                return Err(RelayError::decode("malformed part"));
            }
            let part_bytes = &data[part_start..next - 2];

            parts += 1;
            if parts > MAX_PARTS {
                return Err(RelayError::decode("form has too many parts"));
            }

            if let Some(part) = split_part(part_bytes)? {
                total += part.content.len();
                if total > self.budget {
                    return Err(RelayError::decode("form content exceeds the parse budget"));
                }
                match part.filename {
                    Some(filename) => {
                        let mut file = FilePart::new(filename, part.content.to_vec());
                        if let Some(content_type) = part.content_type {
                            file = file.with_content_type(content_type);
                        }
                        form.push_file(part.name, file);
                    }
                    None => {
                        form.push_value(
                            part.name,
                            String::from_utf8_lossy(part.content).into_owned(),
                        );
                    }
                }
            }

            pos = next;
        }
    }
}

/// One parsed part: disposition attributes plus a borrowed content slice.
struct RawPart<'a> {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    content: &'a [u8],
}

/// Splits a part into headers and content, returning `None` for parts
/// without a usable form-data disposition (those are skipped, not fatal).
fn split_part(part: &[u8]) -> RelayResult<Option<RawPart<'_>>> {
    let (header_bytes, content) = if let Some(rest) = part.strip_prefix(b"\r\n") {
        // Empty header block.
        (&part[..0], rest)
    } else if let Some(end) = find_bytes(part, b"\r\n\r\n", 0) {
        (&part[..end], &part[end + 4..])
    } else {
        return Err(RelayError::decode("part headers are not terminated"));
    };

    let mut disposition = None;
    let mut content_type = None;
    for line in header_bytes
        .split(|&b| b == b'\n')
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
    {
        if line.is_empty() {
            continue;
        }
        let line = String::from_utf8_lossy(line);
        let Some((header_name, value)) = line.split_once(':') else {
            return Err(RelayError::decode("malformed part header line"));
        };
        let header_name = header_name.trim();
        let value = value.trim();
        if header_name.eq_ignore_ascii_case("content-disposition") {
            disposition = Some(value.to_string());
        } else if header_name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    let Some(disposition) = disposition else {
        return Ok(None);
    };
    let Some((name, filename)) = parse_disposition(&disposition) else {
        return Ok(None);
    };

    Ok(Some(RawPart {
        name,
        filename,
        content_type,
        content,
    }))
}

/// Parses a `form-data` content-disposition into (name, filename).
///
/// Returns `None` when the disposition is not form-data or carries no
/// field name; such parts carry nothing the form can use.
fn parse_disposition(value: &str) -> Option<(String, Option<String>)> {
    let mut segments = value.split(';').map(str::trim);
    if !segments.next()?.eq_ignore_ascii_case("form-data") {
        return None;
    }

    let mut name = None;
    let mut filename = None;
    for segment in segments {
        let Some((key, raw)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let unquoted = unquote(raw.trim());
        match key.as_str() {
            "name" => name = Some(unquoted),
            "filename" => filename = Some(unquoted),
            _ => {}
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    Some((name, filename))
}

/// Removes surrounding quotes and backslash escapes from a parameter value.
fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Finds the next delimiter occurrence that sits at a line start.
fn find_delimiter(data: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut at = from;
    while let Some(pos) = find_bytes(data, delimiter, at) {
        if pos == 0 || data[..pos].ends_with(b"\r\n") {
            return Some(pos);
        }
        at = pos + 1;
    }
    None
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
