//! Volume handle lifecycle and state machine tests

use ext_volume::{OpenMode, VolumeError, VolumeHandle};
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn scratch_image() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0xA5u8; 4096]).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_signal_abort_on_fresh_handle() {
    let volume = VolumeHandle::new();

    // Valid in any state, including never-opened.
    volume.signal_abort();
    assert!(volume.abort_requested());
    assert!(!volume.is_open());

    // Signaling twice is idempotent.
    volume.signal_abort();
    assert!(volume.abort_requested());
}

#[test]
fn test_open() {
    let image = scratch_image();
    let mut volume = VolumeHandle::new();

    volume.open(image.path(), OpenMode::Read).unwrap();
    assert!(volume.is_open());

    let err = volume.open(image.path(), OpenMode::Read).unwrap_err();
    assert!(matches!(err, VolumeError::AlreadyOpen));
    assert!(volume.is_open());

    volume.close().unwrap();

    let err = volume.open("", OpenMode::Read).unwrap_err();
    assert!(matches!(err, VolumeError::MissingCapability(_)));
    assert!(!volume.is_open());

    let err = volume.open(image.path(), OpenMode::Write).unwrap_err();
    assert!(matches!(err, VolumeError::UnsupportedMode(OpenMode::Write)));
    assert!(!volume.is_open());
}

#[test]
fn test_open_missing_image() {
    let mut volume = VolumeHandle::new();

    let err = volume
        .open("/nonexistent/image.ext4", OpenMode::Read)
        .unwrap_err();
    match err {
        VolumeError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected IO error, got {other:?}"),
    }
    assert!(!volume.is_open());
}

#[test]
fn test_open_file_object() {
    let image = scratch_image();
    let file_object = Arc::new(File::open(image.path()).unwrap());

    let mut volume = VolumeHandle::new();

    volume
        .open_file_object(&file_object, OpenMode::Read)
        .unwrap();
    assert!(volume.is_open());

    let err = volume
        .open_file_object(&file_object, OpenMode::Read)
        .unwrap_err();
    assert!(matches!(err, VolumeError::AlreadyOpen));

    // The other open form is rejected the same way.
    let err = volume.open(image.path(), OpenMode::Read).unwrap_err();
    assert!(matches!(err, VolumeError::AlreadyOpen));

    volume.close().unwrap();

    let err = volume
        .open_file_object(&file_object, OpenMode::Write)
        .unwrap_err();
    assert!(matches!(err, VolumeError::UnsupportedMode(OpenMode::Write)));
    assert!(!volume.is_open());
}

#[test]
fn test_close() {
    let mut volume = VolumeHandle::new();

    let err = volume.close().unwrap_err();
    assert!(matches!(err, VolumeError::NotOpen));
}

#[test]
fn test_open_close() {
    let image = scratch_image();
    let mut volume = VolumeHandle::new();

    // Test open and close.
    volume.open(image.path(), OpenMode::Read).unwrap();
    volume.close().unwrap();

    // Test open and close a second time to validate clean up on close.
    volume.open(image.path(), OpenMode::Read).unwrap();
    volume.close().unwrap();

    let file_object = Arc::new(File::open(image.path()).unwrap());

    // Test open_file_object and close.
    volume
        .open_file_object(&file_object, OpenMode::Read)
        .unwrap();
    volume.close().unwrap();

    // Test open_file_object and close a second time.
    volume
        .open_file_object(&file_object, OpenMode::Read)
        .unwrap();
    volume.close().unwrap();

    // Test open_file_object, dropping the caller's reference before close.
    volume
        .open_file_object(&file_object, OpenMode::Read)
        .unwrap();
    drop(file_object);
    volume.close().unwrap();
}

#[test]
fn test_double_close() {
    let image = scratch_image();
    let mut volume = VolumeHandle::new();

    volume.open(image.path(), OpenMode::Read).unwrap();
    volume.close().unwrap();

    let err = volume.close().unwrap_err();
    assert!(matches!(err, VolumeError::NotOpen));
}

#[test]
fn test_dropped_stream_fails_reads_but_not_close() {
    let image = scratch_image();
    let file_object = Arc::new(File::open(image.path()).unwrap());

    let mut volume = VolumeHandle::new();
    volume
        .open_file_object(&file_object, OpenMode::Read)
        .unwrap();

    drop(file_object);

    let err = volume.read_at(0, 16).unwrap_err();
    assert!(matches!(err, VolumeError::Io(_)));
    assert!(volume.is_open());

    volume.close().unwrap();
    assert!(!volume.is_open());
}

#[test]
fn test_stream_stays_usable_after_close() {
    let image = scratch_image();
    let file_object = Arc::new(File::open(image.path()).unwrap());

    let mut volume = VolumeHandle::new();
    volume
        .open_file_object(&file_object, OpenMode::Read)
        .unwrap();
    volume.close().unwrap();

    // The caller still owns the stream and can keep using it.
    use ext_volume::StreamObject;
    let mut buf = [0u8; 8];
    assert_eq!(file_object.read_at(0, &mut buf).unwrap(), 8);
    assert_eq!(buf, [0xA5u8; 8]);
}

#[test]
fn test_abort_observed_mid_scan() {
    let image = scratch_image();
    let mut volume = VolumeHandle::new();
    volume.open(image.path(), OpenMode::Read).unwrap();

    volume.read_at(0, 16).unwrap();

    volume.signal_abort();
    let err = volume.read_at(16, 16).unwrap_err();
    assert!(matches!(err, VolumeError::Aborted));
    let err = volume.checkpoint().unwrap_err();
    assert!(matches!(err, VolumeError::Aborted));

    // Close clears the flag; a reopened handle reads normally.
    volume.close().unwrap();
    assert!(!volume.abort_requested());

    volume.open(image.path(), OpenMode::Read).unwrap();
    volume.read_at(0, 16).unwrap();
    volume.close().unwrap();
}

#[test]
fn test_abort_signal_from_another_thread() {
    let image = scratch_image();
    let mut volume = VolumeHandle::new();
    volume.open(image.path(), OpenMode::Read).unwrap();

    let signal = volume.abort_signal();
    let worker = std::thread::spawn(move || signal.signal());
    worker.join().unwrap();

    assert!(volume.abort_requested());
    let err = volume.read_at(0, 16).unwrap_err();
    assert!(matches!(err, VolumeError::Aborted));

    volume.close().unwrap();
}

#[test]
fn test_open_close_scenario() {
    let image = scratch_image();
    let mut volume = VolumeHandle::new();

    volume.open(image.path(), OpenMode::Read).unwrap();
    let err = volume.open(image.path(), OpenMode::Read).unwrap_err();
    assert!(matches!(err, VolumeError::AlreadyOpen));
    volume.close().unwrap();
    let err = volume.close().unwrap_err();
    assert!(matches!(err, VolumeError::NotOpen));
}

#[test]
fn test_drop_while_open_releases_source() {
    let image = scratch_image();
    let file_object = Arc::new(File::open(image.path()).unwrap());

    {
        let mut volume = VolumeHandle::new();
        volume
            .open_file_object(&file_object, OpenMode::Read)
            .unwrap();
        // Dropped while open: teardown releases the source.
    }

    // The handle only ever held a weak reference.
    assert_eq!(Arc::strong_count(&file_object), 1);
}
