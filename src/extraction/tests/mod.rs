use crate::config::ReadinessConfig;
use crate::error::{Error, ExtractError};
use crate::extraction::*;
use crate::signals::{LifecycleSignal, SignalBus};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a valid ZIP archive containing a single file with the given name and content
fn create_zip_archive(archive_path: &Path, file_name: &str, content: &[u8]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    writer.start_file(file_name, options).unwrap();
    std::io::Write::write_all(&mut writer, content).unwrap();
    writer.finish().unwrap();
}

/// Create a valid ZIP archive containing multiple files
fn create_zip_archive_multi(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
}

/// Create a valid 7z archive from a source directory using sevenz_rust
fn create_7z_archive(archive_path: &Path, source_dir: &Path) {
    sevenz_rust::compress_to_path(source_dir, archive_path).unwrap();
}

/// Dispatcher with fast readiness polling for tests
fn test_dispatcher(bus: &SignalBus) -> ArchiveDispatcher {
    ArchiveDispatcher::new(
        ReadinessConfig {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_millis(400),
        },
        bus.clone(),
    )
}

/// Drain every signal currently buffered on a receiver
fn drain_signals(
    rx: &mut tokio::sync::broadcast::Receiver<LifecycleSignal>,
) -> Vec<LifecycleSignal> {
    let mut log = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        log.push(signal);
    }
    log
}

// ---------------------------------------------------------------------------
// Kind detection and job construction
// ---------------------------------------------------------------------------

#[test]
fn detects_supported_kinds_case_insensitively() {
    assert_eq!(
        detect_archive_kind(Path::new("a.zip")),
        Some(ArchiveKind::Zip)
    );
    assert_eq!(
        detect_archive_kind(Path::new("a.ZIP")),
        Some(ArchiveKind::Zip)
    );
    assert_eq!(
        detect_archive_kind(Path::new("/w/b.7z")),
        Some(ArchiveKind::SevenZip)
    );
    assert_eq!(
        detect_archive_kind(Path::new("c.RaR")),
        Some(ArchiveKind::Rar)
    );
}

#[test]
fn rejects_unsupported_and_missing_extensions() {
    assert_eq!(detect_archive_kind(Path::new("a.txt")), None);
    assert_eq!(detect_archive_kind(Path::new("a.tar.gz")), None);
    assert_eq!(detect_archive_kind(Path::new("archive")), None);
    assert_eq!(detect_archive_kind(Path::new(".zip")), None);
}

#[test]
fn job_destination_strips_only_the_final_extension() {
    let job = ExtractionJob::for_path(Path::new("/w/a.zip")).unwrap();
    assert_eq!(job.destination, Path::new("/w/a"));
    assert_eq!(job.kind, ArchiveKind::Zip);

    let job = ExtractionJob::for_path(Path::new("/w/backup.2024.zip")).unwrap();
    assert_eq!(job.destination, Path::new("/w/backup.2024"));
}

#[test]
fn job_construction_fails_for_unsupported_extension() {
    assert!(ExtractionJob::for_path(Path::new("/w/readme.txt")).is_none());
}

// ---------------------------------------------------------------------------
// Per-format extractors
// ---------------------------------------------------------------------------

#[test]
fn zip_extractor_unpacks_single_file() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("a.zip");
    let dest = temp.path().join("a");
    create_zip_archive(&archive, "hello.txt", b"hello world");

    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("hello.txt")]);
    assert_eq!(
        std::fs::read(dest.join("hello.txt")).unwrap(),
        b"hello world"
    );
}

#[test]
fn zip_extractor_preserves_nested_directories() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("nested.zip");
    let dest = temp.path().join("nested");
    create_zip_archive_multi(
        &archive,
        &[
            ("top.txt", b"top".as_slice()),
            ("sub/dir/deep.txt", b"deep".as_slice()),
        ],
    );

    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(std::fs::read(dest.join("top.txt")).unwrap(), b"top");
    assert_eq!(
        std::fs::read(dest.join("sub/dir/deep.txt")).unwrap(),
        b"deep"
    );
}

#[test]
fn zip_extractor_rejects_garbage_as_corrupt() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("bad.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let err = ZipExtractor::extract(&archive, &temp.path().join("bad")).unwrap_err();

    assert!(matches!(
        err,
        Error::Extract(ExtractError::CorruptArchive { .. })
    ));
}

#[test]
fn sevenz_extractor_unpacks_directory_tree() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    std::fs::create_dir_all(source.join("sub")).unwrap();
    std::fs::write(source.join("root.txt"), b"root").unwrap();
    std::fs::write(source.join("sub/leaf.txt"), b"leaf").unwrap();

    let archive = temp.path().join("tree.7z");
    create_7z_archive(&archive, &source);

    let dest = temp.path().join("tree");
    let files = SevenZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files.len(), 2);
    assert!(dest.join("root.txt").exists());
    assert!(dest.join("sub/leaf.txt").exists());
}

#[test]
fn sevenz_extractor_rejects_garbage_as_corrupt() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("bad.7z");
    std::fs::write(&archive, b"this is not a 7z file").unwrap();

    let err = SevenZipExtractor::extract(&archive, &temp.path().join("bad")).unwrap_err();

    assert!(matches!(
        err,
        Error::Extract(ExtractError::CorruptArchive { .. })
    ));
}

#[test]
fn rar_extractor_rejects_garbage_as_corrupt() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("bad.rar");
    std::fs::write(&archive, b"this is not a rar file").unwrap();

    let err = RarExtractor::extract(&archive, &temp.path().join("bad")).unwrap_err();

    assert!(matches!(
        err,
        Error::Extract(ExtractError::CorruptArchive { .. })
    ));
}

// ---------------------------------------------------------------------------
// Dispatcher pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatch_extracts_removes_source_and_signals_once() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("a.zip");
    create_zip_archive(&archive, "hello.txt", b"hello world");

    let bus = SignalBus::new(16);
    let mut rx = bus.subscribe();
    let dispatcher = test_dispatcher(&bus);

    let destination = dispatcher.extract(&archive).await.unwrap();

    assert_eq!(destination, temp.path().join("a"));
    assert_eq!(
        std::fs::read(destination.join("hello.txt")).unwrap(),
        b"hello world"
    );
    assert!(!archive.exists(), "source archive should be deleted");
    assert_eq!(
        drain_signals(&mut rx),
        vec![LifecycleSignal::Started, LifecycleSignal::Finished]
    );
}

#[tokio::test]
async fn dispatch_rejects_unsupported_format_without_signals() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.txt");
    std::fs::write(&file, b"plain text").unwrap();

    let bus = SignalBus::new(16);
    let mut rx = bus.subscribe();
    let dispatcher = test_dispatcher(&bus);

    let err = dispatcher.extract(&file).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Extract(ExtractError::UnsupportedFormat { .. })
    ));
    assert!(file.exists(), "unsupported file must be untouched");
    assert!(
        drain_signals(&mut rx).is_empty(),
        "no signals for a never-attempted job"
    );
}

#[tokio::test]
async fn dispatch_times_out_on_never_ready_file() {
    let temp = TempDir::new().unwrap();
    // Never created, so the readiness probe can never open it
    let archive = temp.path().join("ghost.rar");

    let bus = SignalBus::new(16);
    let mut rx = bus.subscribe();
    let dispatcher = test_dispatcher(&bus);

    let err = dispatcher.extract(&archive).await.unwrap_err();

    assert!(matches!(err, Error::Extract(ExtractError::NotReady { .. })));
    // Busy state must still clear on timeout
    assert_eq!(
        drain_signals(&mut rx),
        vec![LifecycleSignal::Started, LifecycleSignal::Finished]
    );
}

#[tokio::test]
async fn dispatch_keeps_source_of_corrupt_archive() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("bad.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let bus = SignalBus::new(16);
    let mut rx = bus.subscribe();
    let dispatcher = test_dispatcher(&bus);

    let err = dispatcher.extract(&archive).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Extract(ExtractError::CorruptArchive { .. })
    ));
    assert!(
        archive.exists(),
        "corrupt archive must never be deleted, only confirmed successes are"
    );
    assert_eq!(
        drain_signals(&mut rx),
        vec![LifecycleSignal::Started, LifecycleSignal::Finished]
    );
}

#[tokio::test]
async fn dispatch_waits_for_slow_writer_before_extracting() {
    let temp = TempDir::new().unwrap();
    let staging = temp.path().join("staging.zip");
    let archive = temp.path().join("slow.zip");
    create_zip_archive(&staging, "late.txt", b"finally");

    // Simulate a writer finishing a few poll intervals after the event:
    // the complete archive appears atomically via rename
    let rename_to = archive.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        std::fs::rename(&staging, &rename_to).unwrap();
    });

    let bus = SignalBus::new(16);
    let dispatcher = ArchiveDispatcher::new(
        ReadinessConfig {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_secs(5),
        },
        bus.clone(),
    );

    let destination = dispatcher.extract(&archive).await.unwrap();

    assert_eq!(
        std::fs::read(destination.join("late.txt")).unwrap(),
        b"finally"
    );
    assert!(!archive.exists());
}
