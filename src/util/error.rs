use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write to sysfs path: {0}")]
    WriteError(String),

    #[error("Failed to read sysfs path: {0}")]
    ReadError(String),

    #[error("Unsupported system: {0}")]
    Discovery(String),

    #[error("Root privileges required: {0}")]
    Privilege(String),

    #[error("Could not resolve power plan: {0}")]
    PlanResolution(String),

    #[error("Permission denied: {0}. Try running with sudo.")]
    PermissionDenied(String),

    #[error("Failed to parse value: {0}")]
    Parse(String),

    #[error("Path missing: {0}")]
    PathMissing(String),
}
