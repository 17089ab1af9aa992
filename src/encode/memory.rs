use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::encode::engine::{EncodeEngine, check_handle};
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    commands: Vec<Vec<String>>,
    loaded: bool,
    terminate_calls: usize,
    peak_frame_files: usize,
    load_error: Option<String>,
    fail_exec_containing: Option<String>,
}

impl MemoryState {
    fn frame_file_count(&self) -> usize {
        self.files
            .keys()
            .filter(|k| basename(k).starts_with("frame_"))
            .count()
    }

    fn parent_exists(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((parent, _)) => self.dirs.contains(parent),
            None => true,
        }
    }

    fn exec(&mut self, args: &[String]) -> ReelResult<()> {
        let input = arg_after(args, "-i")
            .ok_or_else(|| ReelError::encode("command has no -i input"))?;
        let output = args
            .last()
            .filter(|o| o.as_str() != input)
            .ok_or_else(|| ReelError::encode("command has no output"))?
            .clone();
        check_handle(&output)?;

        let bytes = if arg_after(args, "-f") == Some("concat") {
            self.concat(input)?
        } else {
            self.image_sequence(input)?
        };
        if !self.parent_exists(&output) {
            return Err(ReelError::encode(format!("no namespace for '{output}'")));
        }
        self.files.insert(output, bytes);
        Ok(())
    }

    /// Segment bytes are the frame bytes in sequence order.
    fn image_sequence(&self, pattern: &str) -> ReelResult<Vec<u8>> {
        let (prefix, width, suffix) = parse_sequence_pattern(pattern)?;
        let mut out = Vec::new();
        let mut n = 0usize;
        while let Some(bytes) = self
            .files
            .get(&format!("{prefix}{n:0width$}{suffix}"))
        {
            out.extend_from_slice(bytes);
            n += 1;
        }
        if n == 0 {
            return Err(ReelError::encode(format!(
                "no input frames match '{pattern}'"
            )));
        }
        Ok(out)
    }

    /// Merged bytes are the listed segments joined in list order.
    fn concat(&self, list: &str) -> ReelResult<Vec<u8>> {
        let list_bytes = self
            .files
            .get(list)
            .ok_or_else(|| ReelError::encode(format!("concat list '{list}' not found")))?;
        let text = String::from_utf8_lossy(list_bytes);
        let mut out = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let name = line
                .trim()
                .strip_prefix("file '")
                .and_then(|rest| rest.strip_suffix('\''))
                .ok_or_else(|| ReelError::encode(format!("bad concat list line '{line}'")))?;
            let seg = self
                .files
                .get(name)
                .ok_or_else(|| ReelError::encode(format!("concat input '{name}' not found")))?;
            out.extend_from_slice(seg);
        }
        Ok(out)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Split `dir/frame_%04d.png` into (`dir/frame_`, 4, `.png`).
fn parse_sequence_pattern(pattern: &str) -> ReelResult<(&str, usize, &str)> {
    let bad = || ReelError::encode(format!("'{pattern}' is not an image sequence pattern"));
    let (prefix, rest) = pattern.split_once('%').ok_or_else(bad)?;
    let d = rest.find('d').ok_or_else(bad)?;
    let digits = &rest[..d];
    let width = if digits.is_empty() {
        0
    } else {
        digits.trim_start_matches('0').parse::<usize>().map_err(|_| bad())?
    };
    Ok((prefix, width, &rest[d + 1..]))
}

/// In-process [`EncodeEngine`] for tests and dry runs.
///
/// It understands the two command shapes the pipeline issues: an image-sequence encode produces
/// the frame bytes concatenated in sequence order, and a concat-demuxer stream copy produces the
/// listed segments joined in list order. Every command, write and termination is observable
/// through a [`MemoryEngineProbe`].
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer sharing this engine's state.
    pub fn probe(&self) -> MemoryEngineProbe {
        MemoryEngineProbe {
            state: self.state.clone(),
        }
    }

    /// Make [`EncodeEngine::load`] fail with `msg`.
    pub fn fail_load(self, msg: impl Into<String>) -> Self {
        lock(&self.state).load_error = Some(msg.into());
        self
    }

    /// Make [`EncodeEngine::exec`] fail for any command with an argument containing `needle`.
    pub fn fail_exec_containing(self, needle: impl Into<String>) -> Self {
        lock(&self.state).fail_exec_containing = Some(needle.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    fn loaded_state(&self) -> ReelResult<MutexGuard<'_, MemoryState>> {
        let st = self.state();
        if !st.loaded {
            return Err(ReelError::encode("memory engine is not loaded"));
        }
        Ok(st)
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl EncodeEngine for MemoryEngine {
    fn load(&mut self) -> ReelResult<()> {
        let mut st = self.state();
        if let Some(msg) = st.load_error.clone() {
            return Err(ReelError::initialization(msg));
        }
        st.loaded = true;
        Ok(())
    }

    fn exec(&mut self, args: &[String]) -> ReelResult<()> {
        let mut st = self.loaded_state()?;
        st.commands.push(args.to_vec());
        if let Some(needle) = st.fail_exec_containing.as_deref()
            && args.iter().any(|a| a.contains(needle))
        {
            return Err(ReelError::encode(format!(
                "injected failure for command containing '{needle}'"
            )));
        }
        st.exec(args)
    }

    fn write_file(&mut self, path: &str, data: Vec<u8>) -> ReelResult<()> {
        check_handle(path)?;
        let mut st = self.loaded_state()?;
        if !st.parent_exists(path) {
            return Err(ReelError::encode(format!("no namespace for '{path}'")));
        }
        if st.dirs.contains(path) {
            return Err(ReelError::encode(format!("'{path}' is a namespace")));
        }
        st.files.insert(path.to_owned(), data);
        let frames = st.frame_file_count();
        st.peak_frame_files = st.peak_frame_files.max(frames);
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> ReelResult<Vec<u8>> {
        check_handle(path)?;
        self.loaded_state()?
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ReelError::encode(format!("'{path}' not found")))
    }

    fn delete_file(&mut self, path: &str) -> ReelResult<()> {
        check_handle(path)?;
        self.loaded_state()?
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ReelError::encode(format!("'{path}' not found")))
    }

    fn create_dir(&mut self, path: &str) -> ReelResult<()> {
        check_handle(path)?;
        let mut st = self.loaded_state()?;
        if !st.parent_exists(path) {
            return Err(ReelError::encode(format!("no namespace for '{path}'")));
        }
        if st.files.contains_key(path) || !st.dirs.insert(path.to_owned()) {
            return Err(ReelError::encode(format!("'{path}' already exists")));
        }
        Ok(())
    }

    fn delete_dir(&mut self, path: &str) -> ReelResult<()> {
        check_handle(path)?;
        let mut st = self.loaded_state()?;
        if !st.dirs.contains(path) {
            return Err(ReelError::encode(format!("namespace '{path}' not found")));
        }
        let prefix = format!("{path}/");
        let occupied = st.files.keys().any(|k| k.starts_with(&prefix))
            || st.dirs.iter().any(|d| d.starts_with(&prefix));
        if occupied {
            return Err(ReelError::encode(format!("namespace '{path}' is not empty")));
        }
        st.dirs.remove(path);
        Ok(())
    }

    fn list_dir(&mut self, path: &str) -> ReelResult<Vec<String>> {
        let st = self.loaded_state()?;
        let prefix = match path {
            "" | "." => String::new(),
            p => {
                check_handle(p)?;
                if !st.dirs.contains(p) {
                    return Err(ReelError::encode(format!("namespace '{p}' not found")));
                }
                format!("{p}/")
            }
        };
        let direct = |k: &String| {
            k.strip_prefix(prefix.as_str())
                .filter(|rest| !rest.contains('/'))
                .map(str::to_owned)
        };
        let names: BTreeSet<String> = st
            .files
            .keys()
            .filter_map(direct)
            .chain(st.dirs.iter().filter_map(direct))
            .collect();
        Ok(names.into_iter().collect())
    }

    fn terminate(&mut self) -> ReelResult<()> {
        let mut st = self.state();
        st.terminate_calls += 1;
        st.loaded = false;
        Ok(())
    }
}

/// Read-only view into a [`MemoryEngine`], usable after the engine moved into an export.
#[derive(Clone, Debug)]
pub struct MemoryEngineProbe {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryEngineProbe {
    /// Every executed command, in order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        lock(&self.state).commands.clone()
    }

    /// Executed image-sequence encode commands, in order.
    pub fn encode_commands(&self) -> Vec<Vec<String>> {
        self.commands()
            .into_iter()
            .filter(|c| arg_after(c, "-f") != Some("concat"))
            .collect()
    }

    /// Executed concat commands, in order.
    pub fn concat_commands(&self) -> Vec<Vec<String>> {
        self.commands()
            .into_iter()
            .filter(|c| arg_after(c, "-f") == Some("concat"))
            .collect()
    }

    /// Every stored blob and namespace name, sorted.
    pub fn entries(&self) -> Vec<String> {
        let st = lock(&self.state);
        let all: BTreeSet<String> = st.files.keys().chain(st.dirs.iter()).cloned().collect();
        all.into_iter().collect()
    }

    /// Bytes stored under `path`, if any.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).files.get(path).cloned()
    }

    /// Largest number of `frame_*` blobs that were stored at the same time.
    pub fn peak_frame_files(&self) -> usize {
        lock(&self.state).peak_frame_files
    }

    /// `true` while the engine is loaded and not terminated.
    pub fn is_loaded(&self) -> bool {
        lock(&self.state).loaded
    }

    /// Number of [`EncodeEngine::terminate`] calls received.
    pub fn terminate_calls(&self) -> usize {
        lock(&self.state).terminate_calls
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/memory.rs"]
mod tests;
