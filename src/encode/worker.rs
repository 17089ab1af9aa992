use std::sync::mpsc;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::encode::engine::EncodeEngine;
use crate::foundation::error::{ReelError, ReelResult};

enum EngineOp {
    Load,
    Exec(Vec<String>),
    WriteFile(String, Vec<u8>),
    ReadFile(String),
    DeleteFile(String),
    CreateDir(String),
    DeleteDir(String),
    ListDir(String),
    Terminate,
}

impl EngineOp {
    fn name(&self) -> &'static str {
        match self {
            EngineOp::Load => "load",
            EngineOp::Exec(_) => "exec",
            EngineOp::WriteFile(..) => "write_file",
            EngineOp::ReadFile(_) => "read_file",
            EngineOp::DeleteFile(_) => "delete_file",
            EngineOp::CreateDir(_) => "create_dir",
            EngineOp::DeleteDir(_) => "delete_dir",
            EngineOp::ListDir(_) => "list_dir",
            EngineOp::Terminate => "terminate",
        }
    }
}

enum EngineReply {
    Done,
    Bytes(Vec<u8>),
    Names(Vec<String>),
}

struct EngineRequest {
    id: u64,
    op: EngineOp,
}

struct EngineResponse {
    id: u64,
    result: ReelResult<EngineReply>,
}

/// Client side of a dedicated encode-engine worker thread.
///
/// Every call is one request/response round trip matched by correlation id; the caller blocks
/// until its response arrives. The worker owns the engine and terminates it exactly once, either
/// on an explicit [`EncodeEngine::terminate`] or when the handle is dropped.
pub struct EngineHandle {
    tx: Option<mpsc::Sender<EngineRequest>>,
    rx: mpsc::Receiver<EngineResponse>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
}

impl EngineHandle {
    /// Move `engine` onto its own worker thread.
    pub fn spawn(engine: Box<dyn EncodeEngine>) -> ReelResult<Self> {
        let (req_tx, req_rx) = mpsc::channel::<EngineRequest>();
        let (resp_tx, resp_rx) = mpsc::channel::<EngineResponse>();
        let worker = std::thread::Builder::new()
            .name("alphareel-engine".to_owned())
            .spawn(move || engine_worker(engine, req_rx, resp_tx))
            .map_err(|e| ReelError::initialization(format!("failed to spawn engine worker: {e}")))?;
        Ok(Self {
            tx: Some(req_tx),
            rx: resp_rx,
            worker: Some(worker),
            next_id: 0,
        })
    }

    fn call(&mut self, op: EngineOp) -> ReelResult<EngineReply> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(ReelError::encode("encode engine is terminated"));
        };
        let id = self.next_id;
        self.next_id += 1;
        let op_name = op.name();
        tx.send(EngineRequest { id, op })
            .map_err(|_| ReelError::encode("encode engine worker exited"))?;

        loop {
            let resp = self
                .rx
                .recv()
                .map_err(|_| ReelError::encode("encode engine worker exited"))?;
            if resp.id == id {
                return resp.result;
            }
            debug!(stale_id = resp.id, id, op = op_name, "discarding stale engine response");
        }
    }

    /// Stop the worker and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("encode engine worker panicked");
        }
    }
}

fn unexpected(op: &str) -> ReelError {
    ReelError::Other(anyhow::anyhow!("encode engine returned an unexpected reply to {op}"))
}

impl EncodeEngine for EngineHandle {
    fn load(&mut self) -> ReelResult<()> {
        match self.call(EngineOp::Load)? {
            EngineReply::Done => Ok(()),
            _ => Err(unexpected("load")),
        }
    }

    fn exec(&mut self, args: &[String]) -> ReelResult<()> {
        match self.call(EngineOp::Exec(args.to_vec()))? {
            EngineReply::Done => Ok(()),
            _ => Err(unexpected("exec")),
        }
    }

    fn write_file(&mut self, path: &str, data: Vec<u8>) -> ReelResult<()> {
        match self.call(EngineOp::WriteFile(path.to_owned(), data))? {
            EngineReply::Done => Ok(()),
            _ => Err(unexpected("write_file")),
        }
    }

    fn read_file(&mut self, path: &str) -> ReelResult<Vec<u8>> {
        match self.call(EngineOp::ReadFile(path.to_owned()))? {
            EngineReply::Bytes(bytes) => Ok(bytes),
            _ => Err(unexpected("read_file")),
        }
    }

    fn delete_file(&mut self, path: &str) -> ReelResult<()> {
        match self.call(EngineOp::DeleteFile(path.to_owned()))? {
            EngineReply::Done => Ok(()),
            _ => Err(unexpected("delete_file")),
        }
    }

    fn create_dir(&mut self, path: &str) -> ReelResult<()> {
        match self.call(EngineOp::CreateDir(path.to_owned()))? {
            EngineReply::Done => Ok(()),
            _ => Err(unexpected("create_dir")),
        }
    }

    fn delete_dir(&mut self, path: &str) -> ReelResult<()> {
        match self.call(EngineOp::DeleteDir(path.to_owned()))? {
            EngineReply::Done => Ok(()),
            _ => Err(unexpected("delete_dir")),
        }
    }

    fn list_dir(&mut self, path: &str) -> ReelResult<Vec<String>> {
        match self.call(EngineOp::ListDir(path.to_owned()))? {
            EngineReply::Names(names) => Ok(names),
            _ => Err(unexpected("list_dir")),
        }
    }

    fn terminate(&mut self) -> ReelResult<()> {
        if self.tx.is_none() {
            return Ok(());
        }
        let result = self.call(EngineOp::Terminate).map(|_| ());
        self.shutdown();
        result
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn engine_worker(
    mut engine: Box<dyn EncodeEngine>,
    rx: mpsc::Receiver<EngineRequest>,
    tx: mpsc::Sender<EngineResponse>,
) {
    let mut terminated = false;
    while let Ok(EngineRequest { id, op }) = rx.recv() {
        let is_terminate = matches!(op, EngineOp::Terminate);
        let result = match op {
            EngineOp::Load => engine.load().map(|()| EngineReply::Done),
            EngineOp::Exec(args) => engine.exec(&args).map(|()| EngineReply::Done),
            EngineOp::WriteFile(path, data) => {
                engine.write_file(&path, data).map(|()| EngineReply::Done)
            }
            EngineOp::ReadFile(path) => engine.read_file(&path).map(EngineReply::Bytes),
            EngineOp::DeleteFile(path) => engine.delete_file(&path).map(|()| EngineReply::Done),
            EngineOp::CreateDir(path) => engine.create_dir(&path).map(|()| EngineReply::Done),
            EngineOp::DeleteDir(path) => engine.delete_dir(&path).map(|()| EngineReply::Done),
            EngineOp::ListDir(path) => engine.list_dir(&path).map(EngineReply::Names),
            EngineOp::Terminate => engine.terminate().map(|()| EngineReply::Done),
        };
        let sent = tx.send(EngineResponse { id, result }).is_ok();
        if is_terminate {
            terminated = true;
            break;
        }
        if !sent {
            break;
        }
    }
    if !terminated && let Err(e) = engine.terminate() {
        warn!(error = %e, "encode engine terminate failed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/worker.rs"]
mod tests;
