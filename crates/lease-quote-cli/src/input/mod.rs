pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Read a typed request from `--input <file>` or, failing that, piped stdin.
/// Returns `None` when neither is present.
pub fn file_or_stdin<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_json(path, "request")?));
    }
    stdin::read_stdin()
}
