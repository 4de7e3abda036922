//! Extraction of a single uploaded file from a `multipart/form-data` body.
//!
//! The parser does not copy payload bytes: it returns offsets into the body
//! it was given, which the caller slices when persisting the file.

use std::fmt;

/// RFC 2046 caps boundary tokens at 70 characters.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// Longest filename accepted from a part's `Content-Disposition`.
pub const MAX_FILENAME_LEN: usize = 255;

const FILENAME_MARKER: &[u8] = b"filename=\"";
const PART_HEADERS_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// `Content-Type` carries no `boundary=` parameter.
    MissingBoundary,
    /// The boundary is empty or longer than [`MAX_BOUNDARY_LEN`].
    InvalidBoundary,
    /// No `filename="..."` declaration in the body.
    MissingFilename,
    /// The filename is unterminated, not UTF-8, or too long.
    InvalidFilename,
    /// No blank line after the part headers.
    MissingBody,
    /// No `--<boundary>--` marker after the file data.
    MissingClosingBoundary,
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBoundary => write!(f, "missing boundary in multipart Content-Type"),
            Self::InvalidBoundary => write!(f, "invalid multipart boundary"),
            Self::MissingFilename => write!(f, "no file part in multipart body"),
            Self::InvalidFilename => write!(f, "invalid filename in multipart body"),
            Self::MissingBody => write!(f, "file part has no body"),
            Self::MissingClosingBoundary => write!(f, "missing closing multipart boundary"),
        }
    }
}

impl std::error::Error for MultipartError {}

/// A file part located inside a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// Filename exactly as declared by the client (not yet sanitized).
    pub filename: String,
    /// Offset of the first data byte within the body.
    pub data_start: usize,
    /// Offset one past the last data byte within the body.
    pub data_end: usize,
}

impl MultipartPart {
    /// The file contents, sliced from the body the part was extracted from.
    pub fn data<'a>(&self, body: &'a [u8]) -> &'a [u8] {
        &body[self.data_start..self.data_end]
    }

    pub fn len(&self) -> usize {
        self.data_end - self.data_start
    }

    pub fn is_empty(&self) -> bool {
        self.data_start == self.data_end
    }
}

/// Parses the boundary token from a `Content-Type` value.
///
/// Content-Type format: `multipart/form-data; boundary=----WebKitFormBoundary...`
/// The token may be quoted.
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    for param in content_type.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };

        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(MultipartError::InvalidBoundary);
            }
            return Ok(boundary.to_string());
        }
    }

    Err(MultipartError::MissingBoundary)
}

/// Locates the first file part in `body`.
///
/// The data runs from just after the part's header block up to the next
/// `--<boundary>` delimiter line, minus the CRLF that multipart framing puts in
/// front of every delimiter. A closing `--<boundary>--` must follow.
pub fn extract_file_part(body: &[u8], boundary: &str) -> Result<MultipartPart, MultipartError> {
    let marker = find(body, FILENAME_MARKER, 0).ok_or(MultipartError::MissingFilename)?;

    let name_start = marker + FILENAME_MARKER.len();
    let name_end = find(body, b"\"", name_start).ok_or(MultipartError::InvalidFilename)?;

    let filename = std::str::from_utf8(&body[name_start..name_end])
        .map_err(|_| MultipartError::InvalidFilename)?;
    if filename.len() > MAX_FILENAME_LEN {
        return Err(MultipartError::InvalidFilename);
    }

    let data_start = find(body, PART_HEADERS_END, name_end)
        .map(|pos| pos + PART_HEADERS_END.len())
        .ok_or(MultipartError::MissingBody)?;

    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");

    let mut data_end = find_delimiter(body, delimiter.as_bytes(), data_start)
        .ok_or(MultipartError::MissingClosingBoundary)?;
    if find(body, closing.as_bytes(), data_end).is_none() {
        return Err(MultipartError::MissingClosingBoundary);
    }

    if body[data_start..data_end].ends_with(b"\r\n") {
        data_end -= 2;
    } else if body[data_start..data_end].ends_with(b"\n") {
        data_end -= 1;
    }

    Ok(MultipartPart {
        filename: filename.to_string(),
        data_start,
        data_end,
    })
}

/// Finds a delimiter line at or after `from`: `--<boundary>` at the start
/// of a line, followed by `--` or a line break. Boundary text embedded in
/// the file contents does not match.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut at = from;

    loop {
        let pos = find(body, delimiter, at)?;
        let after = &body[pos + delimiter.len()..];
        let line_start = pos == from || body[pos - 1] == b'\n';

        if line_start && (after.starts_with(b"--") || after.starts_with(b"\r\n")) {
            return Some(pos);
        }
        at = pos + 1;
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_the_framing_crlf() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nline\r\n\r\n--B--\r\n";
        let part = extract_file_part(body, "B").unwrap();
        assert_eq!(part.data(body), b"line\r\n");
    }

    #[test]
    fn find_respects_start_offset() {
        assert_eq!(find(b"abcabc", b"abc", 1), Some(3));
        assert_eq!(find(b"abc", b"abc", 3), None);
    }
}
