use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;

use tracing::warn;

use crate::pipeline::artifacts::{AllocationRow, write_rows_to_path};

struct Checkpoint {
    path: PathBuf,
    rows: Vec<AllocationRow>,
}

/// Background writer for per-generation best-allocation exports.
///
/// The search thread only enqueues; the unbounded channel means a checkpoint
/// never stalls the next generation's start. A failed write is logged and
/// dropped; checkpoints are an audit trail, not pipeline state.
pub struct CheckpointWriter {
    sender: Option<mpsc::Sender<Checkpoint>>,
    handle: Option<JoinHandle<()>>,
}

impl CheckpointWriter {
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel::<Checkpoint>();

        let handle = std::thread::spawn(move || {
            for checkpoint in receiver {
                if let Err(error) = write_rows_to_path(&checkpoint.path, &checkpoint.rows) {
                    warn!(path = %checkpoint.path.display(), %error, "checkpoint write failed");
                }
            }
        });

        CheckpointWriter {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// A clonable handle the search callback can enqueue through.
    pub fn sink(&self) -> CheckpointSink {
        CheckpointSink {
            sender: self
                .sender
                .as_ref()
                .expect("writer not finished yet")
                .clone(),
        }
    }

    /// Drains the queue and joins the writer thread.
    pub fn finish(mut self) {
        self.close();
    }

    fn close(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("checkpoint writer thread panicked");
            }
        }
    }
}

impl Drop for CheckpointWriter {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Clone)]
pub struct CheckpointSink {
    sender: mpsc::Sender<Checkpoint>,
}

impl CheckpointSink {
    pub fn submit(&self, path: PathBuf, rows: Vec<AllocationRow>) {
        // The writer outlives every sink; an error here just means shutdown
        // already started and the checkpoint is moot.
        let _ = self.sender.send(Checkpoint { path, rows });
    }
}
