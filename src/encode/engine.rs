use crate::foundation::error::{ReelError, ReelResult};

/// Command-driven encode engine with its own scratch namespace.
///
/// Paths are `/`-separated handles relative to the namespace root. The pipeline only ever issues
/// two command shapes through [`EncodeEngine::exec`]: "image sequence -> clip" and "stream-copy
/// concat list -> file".
pub trait EncodeEngine: Send {
    /// Check the runtime can run the engine and prepare the namespace.
    fn load(&mut self) -> ReelResult<()>;

    /// Run one command (argument list without the program name).
    fn exec(&mut self, args: &[String]) -> ReelResult<()>;

    /// Store `data` under `path`. The parent namespace must exist.
    fn write_file(&mut self, path: &str, data: Vec<u8>) -> ReelResult<()>;

    /// Read back the bytes stored under `path`.
    fn read_file(&mut self, path: &str) -> ReelResult<Vec<u8>>;

    /// Remove the blob stored under `path`.
    fn delete_file(&mut self, path: &str) -> ReelResult<()>;

    /// Create an (empty) namespace.
    fn create_dir(&mut self, path: &str) -> ReelResult<()>;

    /// Remove an empty namespace.
    fn delete_dir(&mut self, path: &str) -> ReelResult<()>;

    /// Names directly inside `path` (`""` or `"."` for the root), sorted.
    fn list_dir(&mut self, path: &str) -> ReelResult<Vec<String>>;

    /// Release the engine. Safe to call more than once.
    fn terminate(&mut self) -> ReelResult<()>;
}

/// Reject handles that could escape the engine namespace.
pub fn check_handle(path: &str) -> ReelResult<()> {
    if path.is_empty() {
        return Err(ReelError::encode("empty storage handle"));
    }
    if path.starts_with('/') || path.contains('\\') || path.contains(':') {
        return Err(ReelError::encode(format!(
            "storage handle '{path}' must be a relative '/'-separated path"
        )));
    }
    if path.split('/').any(|c| c.is_empty() || c == "." || c == "..") {
        return Err(ReelError::encode(format!(
            "storage handle '{path}' has an empty or relative component"
        )));
    }
    Ok(())
}
