use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;
use tracing::{debug, info};

use crate::encode::engine::{EncodeEngine, check_handle};
use crate::foundation::error::{ReelError, ReelResult};

/// Options for [`FfmpegEngine`].
#[derive(Clone, Debug)]
pub struct FfmpegEngineOpts {
    /// Program to run, resolved through `PATH` when not absolute.
    pub ffmpeg_bin: PathBuf,
    /// Directory the scratch namespace is created in (system temp dir when `None`).
    pub scratch_parent: Option<PathBuf>,
    /// Value passed to `-loglevel`.
    pub log_level: String,
}

impl Default for FfmpegEngineOpts {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            scratch_parent: None,
            log_level: "error".to_owned(),
        }
    }
}

/// `true` when `bin -version` runs successfully.
pub fn is_ffmpeg_available(bin: &Path) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// `true` when an `ffmpeg` binary is on `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_ffmpeg_available(Path::new("ffmpeg"))
}

/// [`EncodeEngine`] backed by the system `ffmpeg` binary and a private temp directory.
///
/// Storage handles map to paths under the temp directory, and every command runs with that
/// directory as its working directory so relative inputs and outputs resolve inside it.
pub struct FfmpegEngine {
    opts: FfmpegEngineOpts,
    scratch: Option<tempfile::TempDir>,
}

impl FfmpegEngine {
    /// Engine with default options.
    pub fn new() -> Self {
        Self::with_opts(FfmpegEngineOpts::default())
    }

    /// Engine with explicit options.
    pub fn with_opts(opts: FfmpegEngineOpts) -> Self {
        Self {
            opts,
            scratch: None,
        }
    }

    /// Root of the scratch namespace while loaded.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|d| d.path())
    }

    fn root(&self) -> ReelResult<&Path> {
        self.scratch_dir()
            .ok_or_else(|| ReelError::encode("ffmpeg engine is not loaded"))
    }

    fn resolve(&self, handle: &str) -> ReelResult<PathBuf> {
        check_handle(handle)?;
        Ok(self.root()?.join(handle))
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeEngine for FfmpegEngine {
    fn load(&mut self) -> ReelResult<()> {
        if self.scratch.is_some() {
            return Ok(());
        }
        if !is_ffmpeg_available(&self.opts.ffmpeg_bin) {
            return Err(ReelError::initialization(format!(
                "ffmpeg is required for encoding, but '{}' could not be run",
                self.opts.ffmpeg_bin.display()
            )));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("alphareel-");
        let dir = match &self.opts.scratch_parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| ReelError::initialization(format!("failed to create scratch dir: {e}")))?;

        info!(scratch = %dir.path().display(), "ffmpeg engine loaded");
        self.scratch = Some(dir);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(output = args.last().map(String::as_str).unwrap_or("")))]
    fn exec(&mut self, args: &[String]) -> ReelResult<()> {
        let root = self.root()?;
        let output = Command::new(&self.opts.ffmpeg_bin)
            .args(["-hide_banner", "-nostdin", "-loglevel", &self.opts.log_level, "-y"])
            .args(args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ReelError::encode(format!("failed to spawn ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        debug!("ffmpeg command finished");
        Ok(())
    }

    fn write_file(&mut self, path: &str, data: Vec<u8>) -> ReelResult<()> {
        let p = self.resolve(path)?;
        std::fs::write(&p, data).with_context(|| format!("write scratch file '{path}'"))?;
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> ReelResult<Vec<u8>> {
        let p = self.resolve(path)?;
        Ok(std::fs::read(&p).with_context(|| format!("read scratch file '{path}'"))?)
    }

    fn delete_file(&mut self, path: &str) -> ReelResult<()> {
        let p = self.resolve(path)?;
        std::fs::remove_file(&p).with_context(|| format!("delete scratch file '{path}'"))?;
        Ok(())
    }

    fn create_dir(&mut self, path: &str) -> ReelResult<()> {
        let p = self.resolve(path)?;
        std::fs::create_dir(&p).with_context(|| format!("create scratch dir '{path}'"))?;
        Ok(())
    }

    fn delete_dir(&mut self, path: &str) -> ReelResult<()> {
        let p = self.resolve(path)?;
        std::fs::remove_dir(&p).with_context(|| format!("delete scratch dir '{path}'"))?;
        Ok(())
    }

    fn list_dir(&mut self, path: &str) -> ReelResult<Vec<String>> {
        let dir = match path {
            "" | "." => self.root()?.to_path_buf(),
            p => self.resolve(p)?,
        };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).with_context(|| format!("list scratch dir '{path}'"))? {
            let entry = entry.with_context(|| format!("list scratch dir '{path}'"))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn terminate(&mut self) -> ReelResult<()> {
        let Some(dir) = self.scratch.take() else {
            return Ok(());
        };
        let path = dir.path().to_path_buf();
        dir.close()
            .with_context(|| format!("remove scratch dir '{}'", path.display()))?;
        debug!(scratch = %path.display(), "ffmpeg engine terminated");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
