//! Optional parity archives for files once they are in place.
//!
//! Archiving is advisory: a failure is reported but the move it follows is
//! never undone.

use crate::error::ArchiveError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Creates a recovery archive next to a moved file
pub trait Archiver {
    /// Returns the path of the archive that was written
    fn archive(&self, final_path: &Path) -> Result<PathBuf, ArchiveError>;
}

/// Runs `par2 create` for each file
#[derive(Debug, Clone)]
pub struct Par2Archiver {
    program: String,
    /// Redundancy percentage passed as `-r`
    redundancy: u8,
}

impl Par2Archiver {
    pub fn new(redundancy: u8) -> Self {
        Self {
            program: "par2".to_string(),
            redundancy,
        }
    }

    /// Use a different executable (e.g. `par2create` or an absolute path)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn archive_path(final_path: &Path) -> PathBuf {
        let mut name = final_path.as_os_str().to_os_string();
        name.push(".par2");
        PathBuf::from(name)
    }
}

impl Default for Par2Archiver {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Archiver for Par2Archiver {
    fn archive(&self, final_path: &Path) -> Result<PathBuf, ArchiveError> {
        let archive = Self::archive_path(final_path);
        let status = Command::new(&self.program)
            .arg("create")
            .arg(format!("-r{}", self.redundancy))
            .arg("-q")
            .arg(&archive)
            .arg(final_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| ArchiveError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ArchiveError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
                path: final_path.to_path_buf(),
            });
        }
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_sits_next_to_the_file() {
        assert_eq!(
            Par2Archiver::archive_path(Path::new("2020/1/2/img.jpg")),
            PathBuf::from("2020/1/2/img.jpg.par2")
        );
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let archiver = Par2Archiver::default().with_program("definitely-not-par2-xyz");
        let err = archiver.archive(Path::new("img.jpg")).unwrap_err();
        assert!(matches!(err, ArchiveError::Launch { .. }));
    }
}
