//! Outer header block composition.
//!
//! Builds the header block that precedes the multipart body: MIME framing,
//! the envelope addresses, and the subject line. Lines end with a bare `\n`
//! and the block closes with an empty line separating header from body.

use crate::config::RelayConfig;

/// Composes the outer header block for a relayed message.
///
/// Emits, in order: `MIME-Version`, `Content-Disposition: inline`,
/// `Content-Type: multipart/mixed` carrying the body boundary, `From`,
/// `To`, and `Subject`. `Subject` must stay the final header line.
pub fn compose_header(config: &RelayConfig, boundary: &str) -> String {
    let mut header = String::new();
    header.push_str("MIME-Version: 1.0\n");
    header.push_str("Content-Disposition: inline\n");
    header.push_str("Content-Type: multipart/mixed; boundary=\"");
    header.push_str(boundary);
    header.push_str("\"\n");
    header.push_str("From: ");
    header.push_str(&config.sender);
    header.push('\n');
    header.push_str("To: ");
    header.push_str(&config.recipient);
    header.push('\n');
    header.push_str("Subject: ");
    header.push_str(&config.subject);
    header.push_str("\n\n");
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RelayConfig {
        RelayConfig::builder()
            .sender("relay@example.org")
            .recipient("owner@example.org")
            .subject("contact me")
            .region("eu-west-1")
            .success_url("https://example.org/sent")
            .failure_url("https://example.org/error")
            .build()
            .unwrap()
    }

    #[test]
    fn test_exact_header_block() {
        let header = compose_header(&test_config(), "bd41");

        assert_eq!(
            header,
            "MIME-Version: 1.0\n\
             Content-Disposition: inline\n\
             Content-Type: multipart/mixed; boundary=\"bd41\"\n\
             From: relay@example.org\n\
             To: owner@example.org\n\
             Subject: contact me\n\n"
        );
    }

    #[test]
    fn test_boundary_is_quoted() {
        let header = compose_header(&test_config(), "----=_Part_0a1b2c");

        assert!(header.contains("boundary=\"----=_Part_0a1b2c\""));
    }

    #[test]
    fn test_subject_is_last_line() {
        let header = compose_header(&test_config(), "bd41");

        let last = header
            .lines()
            .filter(|line| !line.is_empty())
            .next_back()
            .unwrap();
        assert!(last.starts_with("Subject: "));
    }

    #[test]
    fn test_block_ends_with_blank_line() {
        let header = compose_header(&test_config(), "bd41");

        assert!(header.ends_with("\n\n"));
        assert!(!header.ends_with("\n\n\n"));
    }

    #[test]
    fn test_uses_bare_newlines() {
        let header = compose_header(&test_config(), "bd41");

        assert!(!header.contains('\r'));
        assert_eq!(header.matches('\n').count(), 7);
    }
}
