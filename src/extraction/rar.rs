use crate::error::{ExtractError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Archive extractor for RAR files
pub struct RarExtractor;

impl RarExtractor {
    /// Convert an unrar error into a job-terminal extraction error
    fn corrupt(e: unrar::error::UnrarError, archive_path: &Path) -> ExtractError {
        ExtractError::CorruptArchive {
            archive: archive_path.to_path_buf(),
            reason: e.to_string(),
        }
    }

    /// Extract a RAR archive into `dest_path`, creating it if absent
    ///
    /// Walks the archive with unrar's cursor state machine; entry names are
    /// sanitized to normal path components before anything is written, so a
    /// hostile archive cannot escape the destination.
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting RAR extraction");

        std::fs::create_dir_all(dest_path)?;

        let processor = unrar::Archive::new(archive_path)
            .open_for_processing()
            .map_err(|e| Self::corrupt(e, archive_path))?;

        let mut extracted_files = Vec::new();

        let mut at_header = processor;
        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break, // no more entries
                Err(e) => return Err(Self::corrupt(e, archive_path).into()),
            };

            let header = at_file.entry();

            // Keep only Normal components, dropping "..", roots, and prefixes
            let sanitized = Path::new(&header.filename)
                .components()
                .filter(|c| matches!(c, std::path::Component::Normal(_)))
                .collect::<PathBuf>();

            if sanitized.as_os_str().is_empty() {
                warn!(?archive_path, "skipping RAR entry with unsafe path");
                at_header = at_file.skip().map_err(|e| Self::corrupt(e, archive_path))?;
                continue;
            }

            let file_path = dest_path.join(&sanitized);

            if header.is_directory() {
                at_header = at_file.skip().map_err(|e| Self::corrupt(e, archive_path))?;
            } else {
                at_header = at_file
                    .extract_to(&file_path)
                    .map_err(|e| Self::corrupt(e, archive_path))?;
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "RAR extraction successful"
        );

        Ok(extracted_files)
    }
}
