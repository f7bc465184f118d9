//! Command handlers for the Pigeon CLI.

pub mod ask;
pub mod context;
pub mod documents;
pub mod mail;
pub mod prompts;
pub mod threads;

pub use ask::AskCommand;
pub use documents::DocumentsCommand;
pub use mail::{IngestCommand, RegenCommand, ReplyCommand, ResponseCommand};
pub use prompts::PromptsCommand;
pub use threads::ThreadsCommand;

use pigeon_core::AppResult;
use std::path::Path;

/// Read `path`, or stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> AppResult<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(std::io::read_to_string(std::io::stdin())?),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_input_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("email.json");
        std::fs::write(&path, r#"{"sender":"ada@mit.edu"}"#).unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), r#"{"sender":"ada@mit.edu"}"#);
    }

    #[test]
    fn test_read_input_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = read_input(Some(&temp.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, pigeon_core::AppError::Io(_)));
    }
}
