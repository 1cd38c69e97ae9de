use crate::{FileStat, MAX_UPLOAD_BYTES, UploadError};

/// Checks that a stat result describes an uploadable file.
///
/// Rejects:
/// - Missing files
/// - Empty files, or files whose size could not be determined
/// - Files larger than [`MAX_UPLOAD_BYTES`]
///
/// Returns the file size on success.
pub fn check_file_stat(location: &str, stat: &FileStat) -> Result<u64, UploadError> {
    if !stat.exists {
        return Err(UploadError::FileNotFound(location.to_string()));
    }

    let size = match stat.size {
        Some(size) if size > 0 => size,
        _ => return Err(UploadError::EmptyFile(location.to_string())),
    };

    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::FileTooLarge { size });
    }

    Ok(size)
}
