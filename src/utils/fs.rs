//! Filesystem probes

use std::path::Path;
use uuid::Uuid;

/// Check whether a directory exists and is writable by actually writing
/// (and removing) a uniquely named marker file. Permission bits alone are
/// not trustworthy across platforms and network mounts.
pub fn is_writable_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    let marker = path.join(format!(".write_probe_{}", Uuid::new_v4()));
    match std::fs::write(&marker, b"0") {
        Ok(()) => {
            let _ = std::fs::remove_file(&marker);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_writable_dir(dir.path()));
        // The probe must not leave a marker behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_dir_is_not_writable() {
        assert!(!is_writable_dir(Path::new("/no/such/directory/anywhere")));
    }

    #[test]
    fn test_file_is_not_a_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(!is_writable_dir(&file));
    }
}
