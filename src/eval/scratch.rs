//! Scratch Directory
//!
//! The compile-time evaluator works through temporary files in a
//! fixed-name scratch directory. The directory is created once at
//! startup and removed on successful completion; on failure it is left
//! behind so the generated programs can be inspected. Files inside are
//! overwritten per directive invocation, so the compiler must not run
//! in parallel against the same working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resource handle for the scratch directory.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// The fixed directory name used by the compiler.
    pub const DIR_NAME: &'static str = ".complua";

    /// Create the scratch directory under the current working directory.
    pub fn create() -> io::Result<Self> {
        Self::create_at(Self::DIR_NAME)
    }

    /// Create a scratch directory with an explicit name.
    pub fn create_at(name: &str) -> io::Result<Self> {
        let path = PathBuf::from(name);
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory and everything in it.
    pub fn cleanup(self) -> io::Result<()> {
        fs::remove_dir_all(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_cleanup() {
        let scratch = ScratchDir::create_at(".complua-test-scratch").unwrap();
        assert!(scratch.path().is_dir());
        fs::write(scratch.file(".eval"), "return 1").unwrap();
        assert!(scratch.file(".eval").is_file());
        let path = scratch.path().to_path_buf();
        scratch.cleanup().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_file_paths_are_inside() {
        let scratch = ScratchDir::create_at(".complua-test-paths").unwrap();
        assert!(scratch.file(".eval.temp").starts_with(scratch.path()));
        scratch.cleanup().unwrap();
    }
}
