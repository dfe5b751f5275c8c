use crate::buffer::TokenBoundedReader;
use crate::constants;
use crate::headers::Headers;
use encoding_rs::Encoding;
use std::convert::TryFrom;
use std::io::Read;

pub(crate) fn encode(encoding: &'static Encoding, s: &str) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(s);
    bytes.into_owned()
}

fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c <= ' ')
}

/// Reads one header block: `name: value` lines up to an empty line.
///
/// Lines starting with whitespace continue the previous header and are joined
/// to its value with `"; "`. At most `max_size` bytes, line terminators
/// included, may be consumed before the empty line is reached. Only a line
/// without a colon is malformed; the name is whatever precedes the first colon.
pub(crate) fn read_header_block<R: Read>(
    reader: &mut TokenBoundedReader<R>,
    max_size: usize,
    encoding: &'static Encoding,
) -> crate::Result<Headers> {
    let mut headers = Headers::default();
    let mut previous: Option<String> = None;

    let limit = reader.bytes_consumed().saturating_add(max_size as u64);

    while reader.bytes_consumed().saturating_add(constants::CRLF.len() as u64) <= limit {
        let remaining = usize::try_from(limit - reader.bytes_consumed())
            .unwrap_or(usize::MAX)
            .saturating_sub(constants::CRLF.len());
        let raw = reader.read_until(constants::CRLF, remaining)?;
        let (line, _, _) = encoding.decode(&raw);

        if line.is_empty() {
            return Ok(headers);
        }

        if line.starts_with(char::is_whitespace) {
            let value = previous
                .as_ref()
                .and_then(|name| headers.get_mut(name))
                .ok_or_else(|| crate::Error::parse(format!("Header continuation without a header <<{}>>", line)))?;
            value.push_str("; ");
            value.push_str(trim(&line));
            continue;
        }

        let idx = line
            .find(':')
            .ok_or_else(|| crate::Error::parse(format!("Header didn't include a colon <<{}>>", line)))?;

        let name = trim(&line[..idx]);
        headers.insert(name, trim(&line[idx + 1..]).to_owned());
        previous = Some(name.to_owned());
    }

    Err(crate::Error::token_not_found(format!(
        "end of header section within {} bytes",
        max_size
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use http::header;

    fn parse(data: &[u8], max_size: usize) -> crate::Result<Headers> {
        let mut reader = TokenBoundedReader::new(data, 7, std::u64::MAX);
        read_header_block(&mut reader, max_size, UTF_8)
    }

    #[test]
    fn test_header_block() {
        let headers = parse(
            b"Content-Disposition: form-data; name=\"a\"\r\ncontent-type :  text/plain \r\n\r\nrest",
            1024,
        )
        .unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(header::CONTENT_DISPOSITION), Some("form-data; name=\"a\""));
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_continuation_lines() {
        let headers = parse(b"X: a\r\n  b\r\n\tc\r\n\r\n", 1024).unwrap();
        assert_eq!(headers.get("x"), Some("a; b; c"));
    }

    #[test]
    fn test_non_token_header_names() {
        let headers = parse(b"X Custom: v\r\n  w\r\n: empty\r\nX-Next: n\r\n\r\n", 1024).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("x custom"), Some("v; w"));
        assert_eq!(headers.get(""), Some("empty"));
        assert_eq!(headers.get("X-Next"), Some("n"));
    }

    #[test]
    fn test_unlimited_header_block() {
        let headers = parse(b"X: a\r\n\r\n", usize::MAX).unwrap();
        assert_eq!(headers.get("x"), Some("a"));

        let mut reader = TokenBoundedReader::new(&b"--B\r\nX: a\r\n\r\n"[..], 7, std::u64::MAX);
        assert_eq!(reader.matches(b"--B\r\n"), Ok(true));
        let headers = read_header_block(&mut reader, usize::MAX, UTF_8).unwrap();
        assert_eq!(headers.get("x"), Some("a"));
    }

    #[test]
    fn test_header_without_colon() {
        let err = parse(b"Content-Disposition form-data\r\n\r\n", 1024).unwrap_err();
        assert!(matches!(err, crate::Error::ParseError { .. }));
        assert!(err.to_string().contains("colon"));
    }

    #[test]
    fn test_continuation_without_header() {
        let err = parse(b"  orphan\r\n\r\n", 1024).unwrap_err();
        assert!(matches!(err, crate::Error::ParseError { .. }));
    }

    #[test]
    fn test_header_block_size_limit() {
        let block = b"X-Long: aaaaaaaaaaaaaaaaaaaa\r\n\r\n";

        assert!(parse(block, block.len()).is_ok());

        for max_size in 0..block.len() {
            let err = parse(block, max_size).unwrap_err();
            assert!(matches!(err, crate::Error::TokenNotFound { .. }), "max_size {}: {}", max_size, err);
        }
    }

    #[test]
    fn test_unterminated_header_block() {
        let err = parse(b"X: a\r\nY: b", 1024).unwrap_err();
        assert!(matches!(err, crate::Error::TokenNotFound { .. }));
    }
}
