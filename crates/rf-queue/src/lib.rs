//! # rf-queue
//!
//! A persisted FIFO queue that serializes access to an exclusive external
//! resource (the transcoder) across independently launched process
//! instances.
//!
//! The queue is a single JSON file holding an array of instance-identifier
//! strings; the file itself is the synchronization primitive. Every
//! operation is a whole-file read-modify-write, which is **not** atomic
//! under true concurrent writers -- an accepted limitation for a
//! single-operator desktop tool where competitors queue rather than race.
//! An unreadable or corrupt queue file is treated as empty and heals on the
//! next write.
//!
//! A [`QueueClient`] moves through three states: unqueued, waiting (after
//! [`join`](QueueClient::join)), and active (after
//! [`wait_turn`](QueueClient::wait_turn) returns); [`leave`](QueueClient::leave)
//! returns it to unqueued. Waiting is event-driven: the queue file is
//! watched for modification and re-read on every change until this
//! instance is first in line.

use std::path::{Path, PathBuf};

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A handle to one position in a file-backed FIFO queue.
///
/// Each client carries its own generated instance identifier and the queue
/// file path; there is no ambient global state, so multiple queues (or
/// multiple clients in tests) can coexist.
#[derive(Debug, Clone)]
pub struct QueueClient {
    path: PathBuf,
    instance_id: String,
}

impl QueueClient {
    /// Create a client for the queue at `path` with a fresh instance id.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            instance_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Create a client with an explicit instance id.
    pub fn with_instance_id(path: impl Into<PathBuf>, instance_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            instance_id: instance_id.into(),
        }
    }

    /// This client's instance identifier.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Read the persisted queue, treating a missing, unreadable, or corrupt
    /// file as an empty queue.
    fn read_queue(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<Vec<String>>(&contents) {
                Ok(queue) => queue,
                Err(e) => {
                    tracing::warn!(
                        "queue file {} is not a valid string array ({e}); treating as empty",
                        self.path.display()
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }

    fn write_queue(&self, queue: &[String]) -> rf_core::Result<()> {
        let json = serde_json::to_string_pretty(queue).expect("string array serializes");
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Enter the queue: append this instance's id unless already present.
    pub async fn join(&self) -> rf_core::Result<()> {
        let mut queue = self.read_queue();
        if !queue.iter().any(|id| id == &self.instance_id) {
            queue.push(self.instance_id.clone());
            self.write_queue(&queue)?;
        }
        tracing::debug!(
            "joined queue {} at position {}",
            self.path.display(),
            queue.len()
        );
        Ok(())
    }

    /// Block until this instance is first in the queue.
    ///
    /// The file watcher is registered before the first read so a competitor
    /// leaving in between cannot produce a missed wakeup. Transient read
    /// failures while the file is mid-write are ignored; the next change
    /// event re-reads.
    pub async fn wait_turn(&self) -> rf_core::Result<()> {
        let (tx, mut rx) = mpsc::channel::<()>(16);
        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                if event.kind.is_create() || event.kind.is_modify() {
                    let _ = tx.blocking_send(());
                }
            }
        })
        .map_err(watch_error)?;
        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        if self.is_first() {
            return Ok(());
        }

        tracing::info!("waiting for turn in queue {}", self.path.display());
        while rx.recv().await.is_some() {
            if self.is_first() {
                return Ok(());
            }
            tracing::debug!("still waiting in queue");
        }

        // The watcher lives for the whole wait; a closed channel means it
        // was dropped, which cannot happen while we hold it.
        unreachable!("queue watcher dropped while waiting")
    }

    fn is_first(&self) -> bool {
        self.read_queue().first() == Some(&self.instance_id)
    }

    /// Leave the queue: remove this instance's id if present.
    ///
    /// Removes exactly one matching entry. A missing or unreadable queue
    /// file means there is nothing to leave.
    pub async fn leave(&self) -> rf_core::Result<()> {
        let mut queue = self.read_queue();
        if let Some(pos) = queue.iter().position(|id| id == &self.instance_id) {
            queue.remove(pos);
            self.write_queue(&queue)?;
            tracing::debug!("left queue {}", self.path.display());
        }
        Ok(())
    }
}

fn watch_error(e: notify::Error) -> rf_core::Error {
    rf_core::Error::Io {
        source: std::io::Error::other(e),
    }
}

/// Default queue file used to serialize transcoder access, resolved under
/// `dir`.
pub fn default_queue_path(dir: &Path) -> PathBuf {
    dir.join("handbrake-queue.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn queue_file(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("queue.json")
    }

    async fn wait_until(flag: &AtomicBool) {
        for _ in 0..200 {
            if flag.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("condition not reached within 5s");
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let client = QueueClient::new(queue_file(&dir));

        client.join().await.unwrap();
        client.join().await.unwrap();

        let queue = client.read_queue();
        assert_eq!(queue, vec![client.instance_id().to_string()]);
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = queue_file(&dir);
        std::fs::write(&path, "{not an array").unwrap();

        let client = QueueClient::new(&path);
        client.join().await.unwrap();
        assert_eq!(client.read_queue().len(), 1);
    }

    #[tokio::test]
    async fn leave_without_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let client = QueueClient::new(queue_file(&dir));
        client.leave().await.unwrap();
    }

    #[tokio::test]
    async fn leave_removes_exactly_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = queue_file(&dir);
        std::fs::write(&path, r#"["dup", "dup", "other"]"#).unwrap();

        let client = QueueClient::with_instance_id(&path, "dup");
        client.leave().await.unwrap();
        assert_eq!(client.read_queue(), vec!["dup", "other"]);
    }

    #[tokio::test]
    async fn first_in_line_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let client = QueueClient::new(queue_file(&dir));
        client.join().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), client.wait_turn())
            .await
            .expect("wait_turn should not block for the head of the queue")
            .unwrap();
    }

    #[tokio::test]
    async fn turns_are_granted_in_join_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = queue_file(&dir);

        let a = QueueClient::with_instance_id(&path, "a");
        let b = QueueClient::with_instance_id(&path, "b");
        let c = QueueClient::with_instance_id(&path, "c");

        a.join().await.unwrap();
        b.join().await.unwrap();
        c.join().await.unwrap();

        a.wait_turn().await.unwrap();

        let b_done = Arc::new(AtomicBool::new(false));
        let c_done = Arc::new(AtomicBool::new(false));

        let b_task = {
            let b = b.clone();
            let done = b_done.clone();
            tokio::spawn(async move {
                b.wait_turn().await.unwrap();
                done.store(true, Ordering::SeqCst);
            })
        };
        let c_task = {
            let c = c.clone();
            let done = c_done.clone();
            tokio::spawn(async move {
                c.wait_turn().await.unwrap();
                done.store(true, Ordering::SeqCst);
            })
        };

        // Let both waiters register their watchers.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!b_done.load(Ordering::SeqCst));
        assert!(!c_done.load(Ordering::SeqCst));

        a.leave().await.unwrap();
        wait_until(&b_done).await;
        assert!(!c_done.load(Ordering::SeqCst));

        b.leave().await.unwrap();
        wait_until(&c_done).await;

        c.leave().await.unwrap();
        assert!(c.read_queue().is_empty());

        b_task.await.unwrap();
        c_task.await.unwrap();
    }
}
