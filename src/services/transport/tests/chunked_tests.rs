use super::*;

#[test]
fn content_range_uses_inclusive_last_byte() {
    assert_eq!(content_range(0, 5, 10), "bytes 0-4/10");
    assert_eq!(
        content_range(CHUNK_SIZE, CHUNK_SIZE * 2, CHUNK_SIZE * 3),
        format!("bytes {}-{}/{}", CHUNK_SIZE, CHUNK_SIZE * 2 - 1, CHUNK_SIZE * 3)
    );
}

#[test]
fn confirmed_end_is_parsed_from_the_range_header() {
    assert_eq!(parse_confirmed_end("bytes=0-5242879"), Some(5_242_880));
    assert_eq!(parse_confirmed_end(" bytes=0-99 "), Some(100));
    // The server may confirm less than the chunk that was sent.
    assert_eq!(parse_confirmed_end("bytes=0-1048575"), Some(1_048_576));
}

#[test]
fn malformed_range_headers_are_ignored() {
    assert_eq!(parse_confirmed_end("bytes 0-99"), None);
    assert_eq!(parse_confirmed_end("bytes=0"), None);
    assert_eq!(parse_confirmed_end("bytes=0-abc"), None);
    assert_eq!(parse_confirmed_end(""), None);
}

#[test]
fn terminal_codes_complete_the_upload() {
    assert!(is_terminal_success(StatusCode::OK));
    assert!(is_terminal_success(StatusCode::CREATED));
    assert!(!is_terminal_success(StatusCode::PERMANENT_REDIRECT));
    assert!(!is_terminal_success(StatusCode::BAD_REQUEST));
}
