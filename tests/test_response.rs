use courier::error::RequestError;
use courier::http::response::{Body, Response, ResponseBuilder, StatusCode};
use courier::http::writer::{ResponseWriter, WriteProgress, serialize_head};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(body.clone())
        .build();

    let content_length = response.headers.get("Content-Length").unwrap();
    assert_eq!(content_length, &body.len().to_string());
}

#[test]
fn test_response_builder_overrides_wrong_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "999")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.headers.get("Content-Length").unwrap(), "4");
}

#[test]
fn test_response_builder_empty_body() {
    let response = ResponseBuilder::new(StatusCode::Ok).build();

    assert!(response.body.is_empty());
    assert_eq!(response.headers.get("Content-Length").unwrap(), "0");
}

#[test]
fn test_file_body_declares_file_length() {
    let file = tempfile::tempfile().unwrap();
    let response = Response::file(file, 1234, "text/html");

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.content_length(), 1234);
    assert_eq!(response.headers.get("Content-Length").unwrap(), "1234");
    assert_eq!(response.headers.get("Content-Type").unwrap(), "text/html");
    assert!(matches!(response.body, Body::File { len: 1234, .. }));
}

#[test]
fn test_response_helpers() {
    let response = Response::not_found();
    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.body.as_bytes().unwrap(), b"404 Not Found");

    let response = Response::internal_error();
    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(response.body.as_bytes().unwrap(), b"500 Internal Server Error");
}

#[test]
fn test_serialized_head_shape() {
    let head = serialize_head(&Response::not_found());
    let text = String::from_utf8(head).unwrap();

    assert!(text.starts_with("HTTP/1.0 404 Not Found\r\n"));
    assert!(text.contains("Content-Length: 13\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
}

#[test]
fn test_writer_emits_declared_length() {
    let mut writer = ResponseWriter::new(Response::internal_error());
    let mut out = Vec::new();
    assert_eq!(writer.write_to(&mut out).unwrap(), WriteProgress::Done);

    let split = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    assert_eq!(&out[split..], b"500 Internal Server Error");
    assert_eq!(writer.status(), StatusCode::InternalServerError);
}

#[test]
fn test_request_error_statuses() {
    let io = || std::io::Error::other("boom");

    assert_eq!(RequestError::Connection(io()).status(), None);
    assert!(RequestError::Connection(io()).to_response().is_none());
    assert_eq!(
        RequestError::NotFound("/x".into()).status(),
        Some(StatusCode::NotFound)
    );
    for err in [
        RequestError::Malformed("bad".into()),
        RequestError::Oversized { limit: 1 },
        RequestError::EmptyUpload,
        RequestError::Storage(io()),
    ] {
        assert_eq!(err.status(), Some(StatusCode::InternalServerError));
    }
}
