use pdf_stamp::logging::init_logging;

#[test]
fn test_file_logging_needs_a_fresh_subscriber() {
    let dir = tempfile::tempdir().unwrap();

    // Stderr-only setup tolerates an existing subscriber
    assert!(init_logging(None).unwrap().is_none());
    assert!(init_logging(None).unwrap().is_none());

    let err = init_logging(Some(dir.path().join("logs"))).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
}
