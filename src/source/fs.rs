//! Filesystem seam for the direct acquisition strategy.
//!
//! `DirectSource` reads counter files through this trait, so the real
//! `/proc` on Linux and an in-memory stand-in in tests are interchangeable.

use std::io;
use std::path::Path;

/// The two filesystem operations counter acquisition needs.
pub trait FileSystem: Send + Sync {
    /// Reads the whole file into a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Reports whether the path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Passthrough to `std::fs`, for reading the real `/proc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn test_real_fs_reads_existing_file() {
        let fs = RealFs::new();
        // The crate manifest is always present relative to the test cwd.
        let manifest = env::current_dir().unwrap().join("Cargo.toml");
        let content = fs.read_to_string(&manifest).unwrap();
        assert!(content.contains("name = \"stallscope\""));
    }

    #[test]
    fn test_real_fs_missing_file_errors() {
        let fs = RealFs::new();
        let missing = Path::new("/definitely/not/here/stat");
        assert!(!fs.exists(missing));
        assert_eq!(
            fs.read_to_string(missing).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_real_fs_exists() {
        let fs = RealFs::new();
        assert!(fs.exists(&env::current_dir().unwrap().join("Cargo.toml")));
    }
}
