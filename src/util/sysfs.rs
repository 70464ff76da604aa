use crate::util::error::ControlError;
use std::{fs, io, path::Path};

pub type Result<T, E = ControlError> = std::result::Result<T, E>;

/// Storage capability used by every component that touches the kernel.
///
/// The real implementation is [`DevSysfs`]; tests substitute recording or
/// preset-backed fakes. All methods are single-shot: a value the kernel
/// rejects once will be rejected again, so there are no retries.
pub trait SysfsAccessor {
    /// Read the first line of a file, stripped of the trailing newline.
    fn read(&self, path: &Path) -> Result<String>;

    /// Read the entire contents of a file (used for `/proc/cpuinfo`).
    fn read_all(&self, path: &Path) -> Result<String>;

    /// Write a value followed by a newline, truncating the target file.
    ///
    /// Every successful write mutates kernel driver state.
    fn write(&self, path: &Path, value: &str) -> Result<()>;

    /// List the entry names of a directory.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;
}

/// `SysfsAccessor` backed by the live `/sys` and `/proc` trees.
pub struct DevSysfs;

fn map_read_err(p: &Path, e: &io::Error) -> ControlError {
    let error_msg = format!("Path: {:?}, Error: {}", p.display(), e);
    match e.kind() {
        io::ErrorKind::PermissionDenied => ControlError::PermissionDenied(error_msg),
        io::ErrorKind::NotFound => {
            ControlError::PathMissing(format!("Path '{}' does not exist", p.display()))
        }
        _ => ControlError::ReadError(error_msg),
    }
}

impl SysfsAccessor for DevSysfs {
    fn read(&self, path: &Path) -> Result<String> {
        let content = fs::read_to_string(path).map_err(|e| map_read_err(path, &e))?;
        Ok(content.lines().next().unwrap_or_default().trim().to_string())
    }

    fn read_all(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| map_read_err(path, &e))
    }

    fn write(&self, path: &Path, value: &str) -> Result<()> {
        fs::write(path, format!("{value}\n")).map_err(|e| {
            let error_msg = format!("Path: {:?}, Value: '{}', Error: {}", path.display(), value, e);
            match e.kind() {
                io::ErrorKind::PermissionDenied => ControlError::PermissionDenied(error_msg),
                io::ErrorKind::NotFound => {
                    ControlError::PathMissing(format!("Path '{}' does not exist", path.display()))
                }
                _ => ControlError::WriteError(error_msg),
            }
        })
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let entries = fs::read_dir(path).map_err(|e| map_read_err(path, &e))?;
        let mut names = Vec::new();
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_first_line_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling_governor");
        fs::write(&path, "powersave\nperformance\n").unwrap();

        assert_eq!(DevSysfs.read(&path).unwrap(), "powersave");
    }

    #[test]
    fn write_appends_newline_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("max_perf_pct");
        fs::write(&path, "100\n").unwrap();

        DevSysfs.write(&path, "42").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "42\n");
    }

    #[test]
    fn read_missing_path_is_path_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = DevSysfs.read(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ControlError::PathMissing(_)));
    }

    #[test]
    fn list_dir_returns_entry_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("AC0")).unwrap();
        fs::create_dir(dir.path().join("BAT0")).unwrap();

        let mut names = DevSysfs.list_dir(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["AC0".to_string(), "BAT0".to_string()]);
    }
}
