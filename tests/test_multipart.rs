use courier::http::multipart::{MultipartError, extract_file_part, parse_boundary};

fn upload_body(boundary: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\
         \r\n"
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[test]
fn test_parse_boundary() {
    assert_eq!(
        parse_boundary("multipart/form-data; boundary=CusBoundary123").unwrap(),
        "CusBoundary123"
    );
    assert_eq!(
        parse_boundary("multipart/form-data; charset=utf-8; Boundary=\"quoted\"").unwrap(),
        "quoted"
    );
}

#[test]
fn test_parse_boundary_missing_or_invalid() {
    assert_eq!(
        parse_boundary("multipart/form-data"),
        Err(MultipartError::MissingBoundary)
    );
    assert_eq!(
        parse_boundary("multipart/form-data; boundary="),
        Err(MultipartError::InvalidBoundary)
    );
    let long = format!("multipart/form-data; boundary={}", "b".repeat(71));
    assert_eq!(parse_boundary(&long), Err(MultipartError::InvalidBoundary));
}

#[test]
fn test_extract_strips_framing_crlf() {
    let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.txt\"\r\n\r\nhello\r\n--B--";
    let part = extract_file_part(body, "B").unwrap();

    assert_eq!(part.filename, "x.txt");
    assert_eq!(part.data(body), b"hello");
    assert!(part.data_start <= part.data_end);
    assert!(part.data_end <= body.len());
}

#[test]
fn test_extract_binary_contents_verbatim() {
    let contents: Vec<u8> = (0u8..=255).collect();
    let body = upload_body("xyz", "bytes.bin", &contents);

    let part = extract_file_part(&body, "xyz").unwrap();
    assert_eq!(part.filename, "bytes.bin");
    assert_eq!(part.data(&body), &contents[..]);
    assert_eq!(part.len(), 256);
}

#[test]
fn test_extract_keeps_content_newline() {
    let body = upload_body("B", "notes.txt", b"line one\nline two\n");
    let part = extract_file_part(&body, "B").unwrap();
    assert_eq!(part.data(&body), b"line one\nline two\n");
}

#[test]
fn test_extract_empty_file() {
    let body = upload_body("B", "empty.txt", b"");
    let part = extract_file_part(&body, "B").unwrap();
    assert!(part.is_empty());
}

#[test]
fn test_extract_stops_at_next_part() {
    let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nfirst\r\n--B\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nsecond\r\n--B--\r\n";
    let part = extract_file_part(body, "B").unwrap();
    assert_eq!(part.data(body), b"first");
}

#[test]
fn test_extract_missing_filename() {
    let body = b"--B\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nvalue\r\n--B--\r\n";
    assert_eq!(
        extract_file_part(body, "B"),
        Err(MultipartError::MissingFilename)
    );
}

#[test]
fn test_extract_missing_closing_boundary() {
    let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\ntruncated";
    assert_eq!(
        extract_file_part(body, "B"),
        Err(MultipartError::MissingClosingBoundary)
    );

    // A delimiter that is never followed by the closing marker.
    let body = b"--B\r\nContent-Disposition: form-data; filename=\"a.txt\"\r\n\r\ndata\r\n--B\r\n";
    assert_eq!(
        extract_file_part(body, "B"),
        Err(MultipartError::MissingClosingBoundary)
    );
}

#[test]
fn test_extract_wrong_boundary() {
    let body = upload_body("Actual", "a.txt", b"data");
    assert_eq!(
        extract_file_part(&body, "Other"),
        Err(MultipartError::MissingClosingBoundary)
    );
}

#[test]
fn test_extract_missing_part_body() {
    let body = b"--B\r\nContent-Disposition: form-data; filename=\"a.txt\"\r\n--B--";
    assert_eq!(extract_file_part(body, "B"), Err(MultipartError::MissingBody));
}

#[test]
fn test_extract_overlong_filename() {
    let body = upload_body("B", &"n".repeat(300), b"data");
    assert_eq!(
        extract_file_part(&body, "B"),
        Err(MultipartError::InvalidFilename)
    );
}

#[test]
fn test_extract_keeps_boundary_text_inside_contents() {
    let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.txt\"\r\n\r\na--Bz\r\n--B--\r\n";
    let part = extract_file_part(body, "B").unwrap();
    assert_eq!(part.data(body), b"a--Bz");

    // At the start of a line but not followed by `--` or CRLF.
    let contents = b"first\r\n--Bravo\r\nlast";
    let body = upload_body("B", "lines.txt", contents);
    let part = extract_file_part(&body, "B").unwrap();
    assert_eq!(part.data(&body), &contents[..]);
}
