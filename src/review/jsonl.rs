use super::{ReviewQueue, ReviewTicket};
use anyhow::Context;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON object per line to a journal file.
pub struct JsonlReviewQueue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlReviewQueue {
    /// `path` may start with `~`.
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(shellexpand::tilde(path).into_owned()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ReviewQueue for JsonlReviewQueue {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn submit<'a>(
        &'a self,
        ticket: &'a ReviewTicket,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut line = serde_json::to_vec(ticket).context("serialize review ticket")?;
            line.push(b'\n');

            let _guard = self.write_lock.lock().await;
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .with_context(|| format!("open {}", self.path.display()))?;
            file.write_all(&line).await.context("append review ticket")?;
            file.flush().await.context("flush review journal")?;
            Ok(())
        })
    }
}
