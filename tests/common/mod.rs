//! Shared helpers for the end-to-end watch pipeline tests

use autounpack::LifecycleSignal;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

/// Create a valid ZIP archive containing a single file with the given name and content
pub fn create_zip_archive(archive_path: &Path, file_name: &str, content: &[u8]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file(file_name, options).unwrap();
    std::io::Write::write_all(&mut writer, content).unwrap();
    writer.finish().unwrap();
}

/// Create a valid 7z archive whose contents are the files of `source_dir`
pub fn create_7z_archive(archive_path: &Path, source_dir: &Path) {
    sevenz_rust::compress_to_path(source_dir, archive_path).unwrap();
}

/// Stage an archive outside the watched directory, then rename it in.
///
/// The rename makes the complete file appear atomically, the way browsers
/// and download managers finish a download, so the test never races the
/// writer.
pub fn drop_into(staging: &Path, watch_dir: &Path, file_name: &str) {
    std::fs::rename(staging, watch_dir.join(file_name)).unwrap();
}

/// Poll `cond` until it holds or `timeout` expires; returns the final state
pub async fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let started = std::time::Instant::now();
    while started.elapsed() < timeout {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}

/// Drain every signal currently buffered on a receiver
pub fn drain_signals(rx: &mut broadcast::Receiver<LifecycleSignal>) -> Vec<LifecycleSignal> {
    let mut log = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        log.push(signal);
    }
    log
}
