use crate::constant::{Word, NAME, WORD_BYTES};
use clap::ValueEnum;
use colorize::AnsiColor;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyspageErrorCode {
    AllocationFailed,
    MapOverlap,
    DuplicateMapName,
    AliasNotFound,
    MapNotFound,
    InvalidAttribute,
    InvalidConsole,
    ImageWriteError,
    InvalidArgument,
    InvalidArgumentCount,
    TooManyArguments,
    LineTooLong,
    InvalidCharacter,
    NameTooLong,
    TooManyMaps,
    InvalidAddress,
    InvalidConfiguration,
    ScriptReadError,
    CorruptList,
}

#[derive(Debug)]
pub struct SyspageError {
    pub code: SyspageErrorCode,
    pub reason: String,
}

impl SyspageError {
    pub fn new(code: SyspageErrorCode, reason: String) -> Self {
        Self { code, reason }
    }
    /// appends the script location the error was raised at
    pub fn traceback(mut self, path: &str, line_number: usize, line: &str) -> Self {
        self.reason = format!(
            "{}\nat {path}:{line_number}:\n{}",
            self.reason,
            line.trim_end().to_string().yellow()
        );
        self
    }
}

impl fmt::Display for SyspageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = format!(
            "{NAME}: {} {} :: {}",
            "error:".red(),
            format!("{:?}", self.code).yellow(),
            self.reason
        );
        write!(f, "{string}")
    }
}

impl std::error::Error for SyspageError {}

/// byte order of every word stored in the syspage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    pub fn word_to_bytes(self, word: Word) -> [u8; WORD_BYTES] {
        match self {
            Endian::Little => word.to_le_bytes(),
            Endian::Big => word.to_be_bytes(),
        }
    }
    pub fn word_from_bytes(self, bytes: [u8; WORD_BYTES]) -> Word {
        match self {
            Endian::Little => Word::from_le_bytes(bytes),
            Endian::Big => Word::from_be_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_byte_order() {
        assert_eq!(Endian::Little.word_to_bytes(0x1122_3344), [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(Endian::Big.word_to_bytes(0x1122_3344), [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(Endian::Big.word_from_bytes([0, 0, 0x10, 0]), 0x1000);
    }

    #[test]
    fn test_error_display_names_code() {
        let err = SyspageError::new(SyspageErrorCode::MapNotFound, "map [ ddr ] missing".to_string());
        let rendered = err.to_string();
        assert!(rendered.contains("MapNotFound"));
        assert!(rendered.contains("map [ ddr ] missing"));
    }

    #[test]
    fn test_traceback_keeps_code() {
        let err = SyspageError::new(SyspageErrorCode::InvalidArgument, "bad".to_string())
            .traceback("user.plo", 3, "map x 1 2 q\n");
        assert_eq!(err.code, SyspageErrorCode::InvalidArgument);
        assert!(err.reason.contains("user.plo:3"));
    }

    #[test]
    fn test_traceback_quotes_borrowed_line() {
        let source = String::from("alias app1 0x1000 0x20z\r\n");
        let err = {
            let line = source.lines().next().unwrap();
            SyspageError::new(SyspageErrorCode::InvalidArgument, "bad".to_string())
                .traceback("preinit.plo", 1, line)
        };
        drop(source);
        assert!(err.reason.contains("preinit.plo:1"));
        assert!(err.reason.contains("alias app1 0x1000 0x20z"));
    }
}
