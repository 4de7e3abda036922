use crate::http::request::{Method, RequestHead, MAX_PATH_LEN};

/// Blank line separating the header section from the body.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line or header section cannot be interpreted.
    Malformed(&'static str),
    /// The request would not fit in the assembly buffer.
    Oversized { limit: usize },
}

/// Result of checking a buffer for a complete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    /// Headers and the full declared body are buffered.
    Complete(RequestHead),
    /// More bytes are needed.
    Incomplete,
}

/// Checks whether `buf` holds a complete request of at most `limit` bytes.
///
/// The declared body length comes from `Content-Length`, defaulting to 0
/// when the header is absent or unparsable.
pub fn try_assemble_request(buf: &[u8], limit: usize) -> Result<Assembly, ParseError> {
    let Some(header_end) = find_headers_end(buf, 0) else {
        if buf.len() >= limit {
            return Err(ParseError::Oversized { limit });
        }
        return Ok(Assembly::Incomplete);
    };

    let head = parse_head(buf, header_end)?;
    check_assembly(head, buf.len(), limit)
}

/// Decides completeness for an already parsed head.
pub fn check_assembly(
    head: RequestHead,
    bytes_read: usize,
    limit: usize,
) -> Result<Assembly, ParseError> {
    if head.total_len() > limit {
        return Err(ParseError::Oversized { limit });
    }

    if head.is_complete(bytes_read) {
        Ok(Assembly::Complete(head))
    } else {
        Ok(Assembly::Incomplete)
    }
}

/// Finds the header terminator at or after `from`.
///
/// Returns the offset just past the terminator, i.e. where the body starts.
pub fn find_headers_end(buf: &[u8], from: usize) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }

    buf[from..]
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|pos| from + pos + HEADER_TERMINATOR.len())
}

/// Parses the request line and `Content-Length` out of `buf[..header_end]`.
pub fn parse_head(buf: &[u8], header_end: usize) -> Result<RequestHead, ParseError> {
    let head = &buf[..header_end - HEADER_TERMINATOR.len()];

    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(head.len());

    let (method, path) = parse_request_line(&head[..line_end])?;

    Ok(RequestHead {
        method,
        path,
        header_end,
        content_length: content_length(head),
    })
}

/// Reads the method and path tokens of a request line.
///
/// The path is truncated to [`MAX_PATH_LEN`] bytes; the version token is
/// ignored.
pub fn parse_request_line(line: &[u8]) -> Result<(Method, String), ParseError> {
    let mut parts = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());

    let method = parts
        .next()
        .map(Method::from_bytes)
        .ok_or(ParseError::Malformed("empty request line"))?;

    let target = parts
        .next()
        .ok_or(ParseError::Malformed("missing request target"))?;

    let mut target = &target[..target.len().min(MAX_PATH_LEN)];
    // Never leave half a UTF-8 sequence at the cut.
    if let Err(e) = std::str::from_utf8(target) {
        if e.error_len().is_none() {
            target = &target[..e.valid_up_to()];
        }
    }
    let path = String::from_utf8_lossy(target).into_owned();

    Ok((method, path))
}

/// Looks up a header value by name in a header section.
///
/// The request line is skipped; names compare case-insensitively and
/// values are trimmed. Only the matched value has to be UTF-8, so
/// non-ASCII bytes in other headers do not hide it.
pub fn header_value<'a>(head: &'a [u8], name: &str) -> Option<&'a str> {
    head.split(|&b| b == b'\n')
        .skip(1)
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter_map(|line| {
            let colon = line.iter().position(|&b| b == b':')?;
            Some((&line[..colon], &line[colon + 1..]))
        })
        .find(|(key, _)| key.trim_ascii().eq_ignore_ascii_case(name.as_bytes()))
        .and_then(|(_, value)| std::str::from_utf8(value.trim_ascii()).ok())
}

/// Declared `Content-Length` of a header section, 0 when absent or invalid.
pub fn content_length(head: &[u8]) -> usize {
    header_value(head, "Content-Length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n";

        let assembly = try_assemble_request(req, 1024).unwrap();
        let Assembly::Complete(head) = assembly else {
            panic!("expected a complete request");
        };

        assert_eq!(head.method, Method::GET);
        assert_eq!(head.path, "/");
        assert_eq!(head.header_end, req.len());
        assert_eq!(head.content_length, 0);
    }

    #[test]
    fn terminator_search_resumes_mid_sequence() {
        let buf = b"GET / HTTP/1.0\r\n\r\n";
        // A scan that stopped one byte short resumes three bytes earlier,
        // at the start of the terminator that straddles the two reads.
        let scanned = buf.len() - 1;
        assert_eq!(find_headers_end(buf, scanned - 3), Some(buf.len()));
        assert_eq!(find_headers_end(buf, buf.len()), None);
    }

    #[test]
    fn header_lookup_ignores_request_line() {
        let head = b"GET /Content-Length:5 HTTP/1.0\r\nHost: a";
        assert_eq!(header_value(head, "Content-Length"), None);
        assert_eq!(header_value(head, "host"), Some("a"));
    }
}
