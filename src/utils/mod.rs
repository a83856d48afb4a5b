//! Escaping helpers for link rendering

/// Escape `&`, `<`, `>` and `"` as HTML entities.
///
/// Applied to link labels and image alt text before they are embedded in
/// the bracketed link form.
pub fn escape_html(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        match byte {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'"' => out.extend_from_slice(b"&quot;"),
            _ => out.push(byte),
        }
    }
    out
}

/// Bytes that pass through `url_escape` unescaped, besides ASCII
/// alphanumerics. Existing `%XX` escapes are left intact.
const URL_SAFE: &[u8] = b";/?:@&=+$,-_.!~*'()#%";

/// Percent-escape a link destination.
///
/// Conservative: anything outside the unreserved set and the usual URL
/// punctuation is encoded as uppercase `%XX`. Already-encoded sequences are
/// not double-encoded because `%` itself is passed through.
pub fn url_escape(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        if byte.is_ascii_alphanumeric() || URL_SAFE.contains(&byte) {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("%{byte:02X}").as_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_passthrough() {
        assert_eq!(escape_html(b"link label"), b"link label");
    }

    #[test]
    fn test_escape_html_entities() {
        assert_eq!(escape_html(b"a < b & c"), b"a &lt; b &amp; c".to_vec());
        assert_eq!(escape_html(b"say \"hi\""), b"say &quot;hi&quot;".to_vec());
    }

    #[test]
    fn test_url_escape_passthrough() {
        assert_eq!(url_escape(b"guide1"), b"guide1");
        assert_eq!(
            url_escape(b"https://example.com/a?b=c#d"),
            b"https://example.com/a?b=c#d".to_vec()
        );
        assert_eq!(url_escape(b"mailto:user@example.com"), b"mailto:user@example.com".to_vec());
    }

    #[test]
    fn test_url_escape_encodes_spaces_and_non_ascii() {
        assert_eq!(url_escape(b"a b"), b"a%20b".to_vec());
        assert_eq!(url_escape("caf\u{e9}".as_bytes()), b"caf%C3%A9".to_vec());
    }

    #[test]
    fn test_url_escape_preserves_existing_escapes() {
        assert_eq!(url_escape(b"a%20b"), b"a%20b".to_vec());
    }
}
