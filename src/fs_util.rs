use std::fs;
use std::io;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use zip::ZipArchive;

use crate::error::ReportError;

/// Extracts every entry of `zip_path` into `target_dir`, overwriting files
/// that already exist there. Returns the number of files written.
pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<usize, ReportError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        ReportError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|err| ReportError::Archive(err.to_string()))?;

    let mut written = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| ReportError::Archive(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(ReportError::Archive(
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| ReportError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| ReportError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| ReportError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| ReportError::Archive(err.to_string()))?;
        written += 1;
    }
    Ok(written)
}

/// Regular files directly inside `dir` whose extension matches, sorted by
/// name. A missing directory yields nothing.
pub fn files_with_extension(
    dir: &Utf8Path,
    extension: &str,
) -> Result<Vec<Utf8PathBuf>, ReportError> {
    if !dir.as_std_path().exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| ReportError::Filesystem(format!("read {dir}: {err}")))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ReportError::Filesystem(err.to_string()))?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|path| ReportError::Filesystem(format!("non-utf8 path {}", path.display())))?;
        let matches = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.as_std_path().is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// True if any entry name in `dir` ends with `suffix`.
pub fn has_file_with_suffix(dir: &Utf8Path, suffix: &str) -> Result<bool, ReportError> {
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| ReportError::Filesystem(format!("read {dir}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| ReportError::Filesystem(err.to_string()))?;
        if entry.file_name().to_string_lossy().ends_with(suffix) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Removes a file, logging instead of failing.
pub fn remove_quietly(path: &Utf8Path) -> bool {
    match fs::remove_file(path.as_std_path()) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "failed to remove consumed file");
            false
        }
    }
}
