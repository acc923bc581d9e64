use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    TruncatedStream,
    StructuralCorruption,
    UnsupportedRevision,
    InvalidSaveHeader,
    InvalidContainerMagic,
    RawDataPresentOnConversion,
    MissingPlatformIdentity,
    RequiresRepair,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Truncation and structural damage are the failures a repair pass can
    /// act on; everything else needs a different input or a user decision.
    pub fn is_repairable(&self) -> bool {
        matches!(
            self.code,
            CoreErrorCode::TruncatedStream | CoreErrorCode::StructuralCorruption
        )
    }

    pub fn context(self, what: &str) -> Self {
        Self {
            code: self.code,
            message: format!("{what}: {}", self.message),
        }
    }
}

impl From<io::Error> for CoreError {
    fn from(e: io::Error) -> Self {
        let code = match e.kind() {
            io::ErrorKind::UnexpectedEof => CoreErrorCode::TruncatedStream,
            io::ErrorKind::InvalidData => CoreErrorCode::StructuralCorruption,
            _ => CoreErrorCode::Io,
        };
        Self::new(code, e.to_string())
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{CoreError, CoreErrorCode};

    #[test]
    fn io_kinds_map_to_codec_codes() {
        let eof: CoreError = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert_eq!(eof.code, CoreErrorCode::TruncatedStream);
        assert!(eof.is_repairable());

        let bad: CoreError = io::Error::new(io::ErrorKind::InvalidData, "bad count").into();
        assert_eq!(bad.code, CoreErrorCode::StructuralCorruption);

        let denied: CoreError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(denied.code, CoreErrorCode::Io);
        assert!(!denied.is_repairable());
    }
}
