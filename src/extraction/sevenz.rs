use crate::error::{ExtractError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Archive extractor for 7z files
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    /// Extract a 7z archive into `dest_path`, creating it if absent
    ///
    /// The decoder writes the whole archive itself, so after it returns the
    /// output tree is validated for path traversal and then scanned to
    /// report the extracted files.
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting 7z extraction");

        std::fs::create_dir_all(dest_path)?;

        sevenz_rust::decompress_file(archive_path, dest_path).map_err(|e| {
            ExtractError::CorruptArchive {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to extract 7z archive: {}", e),
            }
        })?;

        Self::validate_extracted_paths(archive_path, dest_path)?;
        let extracted_files = Self::collect_extracted_files(dest_path)?;

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "7z extraction successful"
        );

        Ok(extracted_files)
    }

    /// Validate that every extracted path stays within the destination
    fn validate_extracted_paths(archive_path: &Path, dest_path: &Path) -> Result<()> {
        let canonical_dest = dest_path.canonicalize()?;

        fn check_dir(dir: &Path, canonical_dest: &Path, archive_path: &Path) -> Result<()> {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                let canonical = path.canonicalize()?;

                if !canonical.starts_with(canonical_dest) {
                    return Err(ExtractError::CorruptArchive {
                        archive: archive_path.to_path_buf(),
                        reason: format!(
                            "path traversal detected: extracted file {:?} is outside destination",
                            canonical
                        ),
                    }
                    .into());
                }

                if path.is_dir() {
                    check_dir(&path, canonical_dest, archive_path)?;
                }
            }
            Ok(())
        }

        check_dir(dest_path, &canonical_dest, archive_path)
    }

    /// Recursively collect all files (not directories) from a directory
    fn collect_extracted_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    visit_dir(&path, files)?;
                } else {
                    files.push(path);
                }
            }
            Ok(())
        }

        visit_dir(dir, &mut files)?;
        Ok(files)
    }
}
