use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, error};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::error::SinkError;

const REQUEST_BUFFER: usize = 64;

struct AppendRequest {
    lines: Vec<(PathBuf, String)>,
    reply: oneshot::Sender<Vec<Result<(), SinkError>>>,
}

/// Handle to the task that owns every results file.
///
/// All appends, whatever the path, are serialized through one task so lines
/// written concurrently never interleave. Files are opened in append mode
/// and created (with their parent directories) on first use.
#[derive(Clone)]
pub struct AppendWriter {
    tx: mpsc::Sender<AppendRequest>,
}

impl AppendWriter {
    /// Spawn the writer task. It exits once every handle has been dropped.
    pub fn spawn(root: PathBuf, max_open_files: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let task = WriterTask {
            root,
            max_open_files: max_open_files.max(1),
            handles: HashMap::new(),
        };
        let join = tokio::spawn(task.run(rx));
        (Self { tx }, join)
    }

    /// Append one line (a newline is added) to `path`, relative to the root.
    pub async fn append(&self, path: impl Into<PathBuf>, line: String) -> Result<(), SinkError> {
        self.append_many(vec![(path.into(), line)])
            .await
            .pop()
            .unwrap_or(Err(SinkError::WriterClosed))
    }

    /// Append a batch of lines, returning one result per line in order.
    pub async fn append_many(&self, lines: Vec<(PathBuf, String)>) -> Vec<Result<(), SinkError>> {
        let count = lines.len();
        let (reply, reply_rx) = oneshot::channel();

        if self.tx.send(AppendRequest { lines, reply }).await.is_err() {
            return closed(count);
        }
        reply_rx.await.unwrap_or_else(|_| closed(count))
    }
}

fn closed(count: usize) -> Vec<Result<(), SinkError>> {
    (0..count).map(|_| Err(SinkError::WriterClosed)).collect()
}

struct WriterTask {
    root: PathBuf,
    max_open_files: usize,
    handles: HashMap<PathBuf, File>,
}

impl WriterTask {
    async fn run(mut self, mut rx: mpsc::Receiver<AppendRequest>) {
        while let Some(request) = rx.recv().await {
            let mut results = Vec::with_capacity(request.lines.len());
            for (path, line) in &request.lines {
                results.push(self.write_line(path, line).await);
            }
            let _ = request.reply.send(results);
        }

        for (path, mut file) in self.handles.drain() {
            if let Err(e) = file.flush().await {
                error!("Failed to flush {}: {}", path.display(), e);
            }
        }
        debug!("Writer for {} stopped", self.root.display());
    }

    async fn write_line(&mut self, relative: &Path, line: &str) -> Result<(), SinkError> {
        let path = self.root.join(relative);

        if !self.handles.contains_key(&path) {
            if self.handles.len() >= self.max_open_files {
                self.handles.clear();
            }
            let file = open_append(&path).await?;
            self.handles.insert(path.clone(), file);
        }

        let Some(file) = self.handles.get_mut(&path) else {
            return Err(SinkError::WriterClosed);
        };

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let result = async {
            file.write_all(buf.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            self.handles.remove(&path);
            return Err(e.into());
        }
        Ok(())
    }
}

async fn open_append(path: &Path) -> Result<File, SinkError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(file)
}
