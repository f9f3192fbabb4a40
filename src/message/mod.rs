//! Outbound MIME message building.
//!
//! [`MessageWriter`] assembles the multipart/mixed body for one submission:
//! first the text part carrying the fixed contact fields, then one part per
//! attached file, then the terminating delimiter. Attachment content is
//! streamed through a base64 encoder wrapped at 76 columns (RFC 2045) and
//! finalized on every path. The body bytes only become available by calling
//! [`close`](MessageWriter::close), which consumes the writer, so an
//! unterminated body cannot reach a transport.

use std::io::{self, Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::write::EncoderWriter;
use uuid::Uuid;

use crate::errors::{RelayError, RelayResult};
use crate::multipart::{DecodedForm, FilePart};

/// Placeholder rendered for contact fields the sender left empty.
pub const PLACEHOLDER: &str = "(withheld)";

/// Maximum base64 line length inside attachment parts.
const BASE64_LINE_LEN: usize = 76;

/// Writes a multipart/mixed body into a byte sink.
///
/// One writer serves exactly one submission; its boundary token is
/// generated at construction and must be echoed into the outer header by
/// the caller.
pub struct MessageWriter<W: Write> {
    sink: W,
    boundary: String,
    charset: String,
}

impl<W: Write> MessageWriter<W> {
    /// Creates a writer over a byte sink, generating a fresh boundary.
    pub fn new(sink: W, charset: &str) -> Self {
        Self {
            sink,
            boundary: generate_boundary(),
            charset: charset.to_ascii_lowercase(),
        }
    }

    /// Returns the boundary token delimiting this body's parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Writes the text part carrying the fixed contact fields.
    ///
    /// Always the first part. Fields are rendered in fixed label order;
    /// an empty field shows [`PLACEHOLDER`] so the body stays well-formed
    /// and labeled no matter what was submitted.
    pub fn write_text_part(&mut self, form: &DecodedForm) -> RelayResult<()> {
        let content_type = format!("text/plain; charset={}", self.charset);
        self.write_delimiter()?;
        self.write_part_header("Content-Type", &content_type)?;
        self.write_part_header("Content-Transfer-Encoding", "quoted-printable")?;
        self.sink.write_all(b"\r\n")?;

        let text = render_contact_fields(form);
        self.sink
            .write_all(&quoted_printable::encode(text.as_bytes()))?;
        self.sink.write_all(b"\r\n")?;
        Ok(())
    }

    /// Writes one attachment part for an attached file.
    ///
    /// A part with an empty filename marks an unused upload slot and is
    /// skipped; the return value reports whether a part was emitted. The
    /// declared content type comes from the filename's extension, falling
    /// back to `application/octet-stream`.
    pub fn write_attachment(&mut self, file: &FilePart) -> RelayResult<bool> {
        if !file.is_attached() {
            return Ok(false);
        }

        let content_type = content_type_for(file.filename());
        let disposition = format!(
            "attachment; filename=\"{}\"",
            sanitize_filename(file.filename())
        );
        self.write_delimiter()?;
        self.write_part_header("Content-Type", &content_type)?;
        self.write_part_header("Content-Transfer-Encoding", "base64")?;
        self.write_part_header("Content-Disposition", &disposition)?;
        self.sink.write_all(b"\r\n")?;

        self.stream_base64(&mut file.open())?;
        Ok(true)
    }

    /// Emits the terminating delimiter and hands back the finished body.
    ///
    /// Consuming the writer here is what guarantees no unclosed body is
    /// ever dispatched.
    pub fn close(mut self) -> RelayResult<W> {
        self.sink
            .write_all(format!("--{}--\r\n", self.boundary).as_bytes())?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Streams content through a base64 encoder into the sink, wrapping
    /// lines and finalizing the encoder before returning.
    fn stream_base64<R: Read>(&mut self, content: &mut R) -> RelayResult<()> {
        let mut wrapper = LineWrapper::new(&mut self.sink);
        // The encoder holds the wrapper borrow until it is dropped.
        {
            let mut encoder = EncoderWriter::new(&mut wrapper, &BASE64);
            io::copy(content, &mut encoder).map_err(|err| {
                RelayError::build("streaming attachment content failed").with_cause(err)
            })?;
            encoder.finish().map_err(|err| {
                RelayError::build("base64 encoder finalization failed").with_cause(err)
            })?;
        }
        wrapper.terminate()?;
        Ok(())
    }

    fn write_delimiter(&mut self) -> RelayResult<()> {
        self.sink
            .write_all(format!("--{}\r\n", self.boundary).as_bytes())?;
        Ok(())
    }

    fn write_part_header(&mut self, name: &str, value: &str) -> RelayResult<()> {
        if value.contains(['\r', '\n']) {
            return Err(RelayError::build(format!(
                "part header {name} value contains line breaks"
            )));
        }
        self.sink
            .write_all(format!("{name}: {value}\r\n").as_bytes())?;
        Ok(())
    }
}

/// Renders the fixed contact fields in their fixed label order.
fn render_contact_fields(form: &DecodedForm) -> String {
    format!(
        "name:  {}\n\nemail: {}\n\nmessage:\n\n{}",
        field_or_placeholder(form, "name"),
        field_or_placeholder(form, "email"),
        field_or_placeholder(form, "message"),
    )
}

fn field_or_placeholder(form: &DecodedForm, name: &str) -> String {
    let joined = form.joined(name);
    if joined.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        joined
    }
}

/// Derives a content type from the filename's extension.
fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

/// Makes a filename safe for a quoted header parameter: backslash-escapes
/// quotes and backslashes, drops line breaks.
fn sanitize_filename(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '\r' | '\n' => {}
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Generates a unique boundary token.
fn generate_boundary() -> String {
    format!("----=_Part_{}", Uuid::new_v4().simple())
}

/// Write adapter inserting a CRLF after every [`BASE64_LINE_LEN`] bytes.
struct LineWrapper<W: Write> {
    inner: W,
    column: usize,
    wrote: bool,
}

impl<W: Write> LineWrapper<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            column: 0,
            wrote: false,
        }
    }

    /// Terminates the final line. An empty stream still gets its line
    /// ending so the part's content region ends at a line start.
    fn terminate(&mut self) -> io::Result<()> {
        if self.column > 0 || !self.wrote {
            self.inner.write_all(b"\r\n")?;
            self.column = 0;
        }
        Ok(())
    }
}

impl<W: Write> Write for LineWrapper<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let room = BASE64_LINE_LEN - self.column;
            let take = room.min(buf.len() - written);
            self.inner.write_all(&buf[written..written + take])?;
            written += take;
            self.column += take;
            self.wrote = true;
            if self.column == BASE64_LINE_LEN {
                self.inner.write_all(b"\r\n")?;
                self.column = 0;
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RelayErrorKind;
    use base64::Engine;
    use rstest::rstest;

    /// Splits a closed body into (part headers, part content) pairs.
    fn split_body(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
        let text = String::from_utf8_lossy(body);
        let delimiter = format!("--{boundary}\r\n");
        let terminator = format!("--{boundary}--");
        let mut parts = Vec::new();
        for raw in text.split(&delimiter).skip(1) {
            let raw = match raw.find(&terminator) {
                Some(end) => &raw[..end],
                None => raw,
            };
            let (headers, content) = raw
                .split_once("\r\n\r\n")
                .expect("part must have a blank line after headers");
            let content = content
                .strip_suffix("\r\n")
                .expect("part content must end at a line start");
            parts.push((headers.to_string(), content.as_bytes().to_vec()));
        }
        parts
    }

    fn qp_decode(content: &[u8]) -> String {
        let bytes =
            quoted_printable::decode(content, quoted_printable::ParseMode::Robust).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn b64_decode(content: &[u8]) -> Vec<u8> {
        let stripped: Vec<u8> = content
            .iter()
            .copied()
            .filter(|&b| b != b'\r' && b != b'\n')
            .collect();
        BASE64.decode(stripped).unwrap()
    }

    /// Sink that rejects writes once its byte allowance is spent.
    #[derive(Debug)]
    struct FailingSink {
        remaining: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.remaining {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "sink exhausted"));
            }
            self.remaining -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_text_part_labels_and_placeholders() {
        let mut form = DecodedForm::new();
        form.push_value("name", "Ada Lovelace");

        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_text_part(&form).unwrap();
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let parts = split_body(&body, &boundary);
        assert_eq!(parts.len(), 1);
        let (headers, content) = &parts[0];
        assert!(headers.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(headers.contains("Content-Transfer-Encoding: quoted-printable"));
        assert_eq!(
            qp_decode(content),
            "name:  Ada Lovelace\n\nemail: (withheld)\n\nmessage:\n\n(withheld)"
        );
    }

    #[test]
    fn test_text_part_joins_repeated_values() {
        let mut form = DecodedForm::new();
        form.push_value("name", "first");
        form.push_value("name", "second");
        form.push_value("email", "a@example.com");
        form.push_value("message", "hello there");

        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_text_part(&form).unwrap();
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let (_, content) = &split_body(&body, &boundary)[0];
        assert_eq!(
            qp_decode(content),
            "name:  first\nsecond\n\nemail: a@example.com\n\nmessage:\n\nhello there"
        );
    }

    #[test]
    fn test_text_part_survives_quoted_printable_round_trip() {
        let mut form = DecodedForm::new();
        form.push_value("message", "héllo — schöne Grüße ✓");

        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_text_part(&form).unwrap();
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let (_, content) = &split_body(&body, &boundary)[0];
        let decoded = qp_decode(content);
        assert!(decoded.contains("héllo — schöne Grüße ✓"));
        // The encoded wire form stays 7-bit safe.
        assert!(content.iter().all(u8::is_ascii));
    }

    #[rstest]
    #[case("report.pdf", "application/pdf")]
    #[case("notes.txt", "text/plain")]
    #[case("photo.JPG", "image/jpeg")]
    #[case("archive.no-such-ext", "application/octet-stream")]
    #[case("no_extension", "application/octet-stream")]
    fn test_attachment_content_type_from_extension(
        #[case] filename: &str,
        #[case] expected: &str,
    ) {
        let file = FilePart::new(filename, b"data".to_vec());
        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        assert!(writer.write_attachment(&file).unwrap());
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let (headers, _) = &split_body(&body, &boundary)[0];
        assert!(
            headers.contains(&format!("Content-Type: {expected}")),
            "expected {expected} in {headers}"
        );
        assert!(headers.contains("Content-Transfer-Encoding: base64"));
        assert!(headers.contains(&format!("Content-Disposition: attachment; filename=\"{filename}\"")));
    }

    #[test]
    fn test_attachment_base64_round_trip() {
        let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let file = FilePart::new("blob.bin", content.clone());

        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_attachment(&file).unwrap();
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let (_, encoded) = &split_body(&body, &boundary)[0];
        assert_eq!(b64_decode(encoded), content);

        // Encoded lines stay within the RFC 2045 limit, wrapping at it.
        let lines: Vec<&[u8]> = encoded
            .split(|&b| b == b'\n')
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .filter(|l| !l.is_empty())
            .collect();
        assert!(lines.iter().all(|l| l.len() <= BASE64_LINE_LEN));
        assert!(lines.iter().any(|l| l.len() == BASE64_LINE_LEN));
    }

    #[test]
    fn test_attachment_with_empty_content() {
        let file = FilePart::new("empty.log", Vec::new());
        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        assert!(writer.write_attachment(&file).unwrap());
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let (_, encoded) = &split_body(&body, &boundary)[0];
        assert!(b64_decode(encoded).is_empty());
    }

    #[test]
    fn test_multiple_attachments_in_submission_order() {
        let first = FilePart::new("first.txt", b"alpha".to_vec());
        let second = FilePart::new("second.bin", vec![0xAB; 200]);

        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        assert!(writer.write_attachment(&first).unwrap());
        assert!(writer.write_attachment(&second).unwrap());
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let parts = split_body(&body, &boundary);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].0.contains("filename=\"first.txt\""));
        assert_eq!(b64_decode(&parts[0].1), b"alpha");
        assert!(parts[1].0.contains("filename=\"second.bin\""));
        assert_eq!(b64_decode(&parts[1].1), vec![0xAB; 200]);
    }

    #[test]
    fn test_unattached_slot_is_skipped() {
        let mut form = DecodedForm::new();
        form.push_value("name", "Ada");
        let unused = FilePart::new("", Vec::new());

        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_text_part(&form).unwrap();
        assert!(!writer.write_attachment(&unused).unwrap());
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        assert_eq!(split_body(&body, &boundary).len(), 1);
    }

    #[test]
    fn test_close_emits_single_terminator() {
        let mut form = DecodedForm::new();
        form.push_value("name", "Ada");
        let file = FilePart::new("a.txt", b"attached".to_vec());

        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_text_part(&form).unwrap();
        writer.write_attachment(&file).unwrap();
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();
        let text = String::from_utf8(body).unwrap();

        assert_eq!(text.matches(&format!("--{boundary}\r\n")).count(), 2);
        assert_eq!(text.matches(&format!("--{boundary}--\r\n")).count(), 1);
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_filename_escaping_in_disposition() {
        let file = FilePart::new("we\"ird\\name.bin", b"x".to_vec());
        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_attachment(&file).unwrap();
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let (headers, _) = &split_body(&body, &boundary)[0];
        assert!(headers.contains("filename=\"we\\\"ird\\\\name.bin\""));
    }

    #[test]
    fn test_filename_line_breaks_are_dropped() {
        let file = FilePart::new("sneaky\r\nInjected: yes.pdf", b"x".to_vec());
        let mut writer = MessageWriter::new(Vec::new(), "UTF-8");
        writer.write_attachment(&file).unwrap();
        let boundary = writer.boundary().to_string();
        let body = writer.close().unwrap();

        let (headers, _) = &split_body(&body, &boundary)[0];
        assert!(headers.contains("filename=\"sneakyInjected: yes.pdf\""));
        assert!(!headers.contains("\r\nInjected"));
    }

    #[test]
    fn test_text_part_write_failure_is_build_error() {
        let mut form = DecodedForm::new();
        form.push_value("name", "Ada");

        let mut writer = MessageWriter::new(FailingSink { remaining: 8 }, "UTF-8");
        let err = writer.write_text_part(&form).unwrap_err();
        assert_eq!(err.kind(), RelayErrorKind::Build);
    }

    #[test]
    fn test_attachment_stream_failure_is_build_error() {
        let file = FilePart::new("blob.bin", vec![7u8; 4096]);

        // Room for the part headers; the content stream hits the wall.
        let mut writer = MessageWriter::new(FailingSink { remaining: 256 }, "UTF-8");
        let err = writer.write_attachment(&file).unwrap_err();
        assert_eq!(err.kind(), RelayErrorKind::Build);
    }

    #[test]
    fn test_close_failure_is_build_error() {
        let writer = MessageWriter::new(FailingSink { remaining: 0 }, "UTF-8");
        let err = writer.close().unwrap_err();
        assert_eq!(err.kind(), RelayErrorKind::Build);
    }

    #[test]
    fn test_boundaries_are_unique_per_writer() {
        let a = MessageWriter::new(Vec::new(), "UTF-8");
        let b = MessageWriter::new(Vec::new(), "UTF-8");
        assert_ne!(a.boundary(), b.boundary());
        assert!(a.boundary().len() <= crate::multipart::MAX_BOUNDARY_LEN);
    }
}
