//! Chunked downloads with progress reporting.

use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{DriveError, Result};
use crate::store::{ContentStream, RemoteStore};

/// Progress after one call to [`Downloader::next_chunk`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkStatus {
    /// Fraction transferred, in `[0.0, 1.0]`.
    pub progress: f64,
    /// Bytes written so far.
    pub bytes: u64,
    pub done: bool,
}

/// Fraction of `total` covered by `bytes`. Unknown totals report zero until
/// the transfer finishes.
pub fn progress_fraction(bytes: u64, total: Option<u64>) -> f64 {
    match total {
        Some(0) => 1.0,
        Some(total) => (bytes as f64 / total as f64).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Streams one remote object into a writer.
///
/// A downloader is single-use: once consumed or dropped, a new one starts
/// again from the first byte.
pub struct Downloader<'a, S: RemoteStore + ?Sized, W> {
    store: &'a S,
    file_id: String,
    writer: W,
    content: Option<ContentStream>,
    bytes: u64,
    done: bool,
}

impl<'a, S, W> Downloader<'a, S, W>
where
    S: RemoteStore + ?Sized,
    W: AsyncWrite + Unpin,
{
    pub fn new(store: &'a S, file_id: impl Into<String>, writer: W) -> Self {
        Self {
            store,
            file_id: file_id.into(),
            writer,
            content: None,
            bytes: 0,
            done: false,
        }
    }

    /// Transfer the next chunk.
    pub async fn next_chunk(&mut self) -> Result<ChunkStatus> {
        if self.done {
            return Ok(self.status(None));
        }

        let content = match self.content.take() {
            Some(content) => content,
            None => {
                log::debug!("opening content of {}", self.file_id);
                self.store.get_content(&self.file_id).await?
            }
        };
        let content = self.content.insert(content);
        let total = content.total;

        match content.chunks.next().await {
            Some(chunk) => {
                let chunk = chunk?;
                self.writer.write_all(&chunk).await?;
                self.bytes += chunk.len() as u64;
                if total.is_some_and(|t| self.bytes >= t) {
                    self.finish().await?;
                }
            }
            None => {
                if let Some(expected) = total.filter(|&t| t != self.bytes) {
                    return Err(DriveError::IncompleteTransfer {
                        expected,
                        received: self.bytes,
                    });
                }
                self.finish().await?
            }
        }

        Ok(self.status(total))
    }

    /// Drive the transfer to the end, reporting each step to `on_progress`.
    pub async fn run<F>(mut self, mut on_progress: F) -> Result<u64>
    where
        F: FnMut(&ChunkStatus),
    {
        loop {
            let status = self.next_chunk().await?;
            on_progress(&status);
            if status.done {
                return Ok(status.bytes);
            }
        }
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush().await?;
        self.done = true;
        Ok(())
    }

    fn status(&self, total: Option<u64>) -> ChunkStatus {
        let progress = if self.done {
            1.0
        } else {
            progress_fraction(self.bytes, total)
        };
        ChunkStatus {
            progress,
            bytes: self.bytes,
            done: self.done,
        }
    }
}
