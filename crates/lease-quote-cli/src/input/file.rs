use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a JSON document from disk. `what` names the document in error
/// messages, e.g. "dataset" or "request".
pub fn read_json<T: DeserializeOwned>(
    path: &str,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let path = Path::new(path);
    if path.is_dir() {
        return Err(format!("The {} path '{}' is a directory", what, path.display()).into());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {} '{}': {}", what, path.display(), e))?;
    debug!(path = %path.display(), bytes = contents.len(), what, "Read JSON input");

    serde_json::from_str(&contents).map_err(|e| {
        format!(
            "Invalid {} '{}' (line {}, column {}): {}",
            what,
            path.display(),
            e.line(),
            e.column(),
            e
        )
        .into()
    })
}
