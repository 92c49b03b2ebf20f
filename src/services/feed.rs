// src/services/feed.rs

//! Change feed adapters.
//!
//! A feed yields raw JSON change events one at a time. The coordinator owns
//! the only reader; it wraps [`ChangeFeed::recv`] in an idle timeout, so
//! `recv` must be cancel-safe.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// Source of raw change events.
#[async_trait]
pub trait ChangeFeed: Send {
    /// Wait for the next payload. `Ok(None)` means the feed has ended.
    async fn recv(&mut self) -> Result<Option<String>>;

    /// Keep-alive check. Must not block or disturb a pending `recv`.
    fn probe(&self) -> Result<()>;

    /// Re-establish the underlying transport. Repeated calls are harmless.
    async fn reconnect(&mut self) -> Result<()>;
}

/// Probe and reconnect counters shared with the feed's owner.
#[derive(Debug, Clone, Default)]
pub struct FeedCounters {
    probes: Arc<AtomicUsize>,
    reconnects: Arc<AtomicUsize>,
}

impl FeedCounters {
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> usize {
        self.reconnects.load(Ordering::Relaxed)
    }
}

/// In-process feed backed by a tokio channel.
#[derive(Debug)]
pub struct ChannelFeed {
    rx: mpsc::Receiver<String>,
    counters: FeedCounters,
}

impl ChannelFeed {
    /// Create a feed and the sender that publishes into it.
    pub fn new(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx,
                counters: FeedCounters::default(),
            },
        )
    }

    pub fn counters(&self) -> FeedCounters {
        self.counters.clone()
    }
}

#[async_trait]
impl ChangeFeed for ChannelFeed {
    async fn recv(&mut self) -> Result<Option<String>> {
        Ok(self.rx.recv().await)
    }

    fn probe(&self) -> Result<()> {
        self.counters.probes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.counters.reconnects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Newline-delimited JSON read from a file or stdin.
///
/// Blank lines are skipped. A byte stream cannot be reopened, so
/// `reconnect` only logs.
pub struct LineFeed<R> {
    lines: Lines<R>,
    source: String,
    line_no: usize,
}

impl<R> LineFeed<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            source: source.into(),
            line_no: 0,
        }
    }
}

impl LineFeed<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), "stdin")
    }
}

impl LineFeed<BufReader<tokio::fs::File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

#[async_trait]
impl<R> ChangeFeed for LineFeed<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<String>> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| AppError::feed(format!("{}: {e}", self.source)))?;
            match line {
                Some(line) if line.trim().is_empty() => self.line_no += 1,
                Some(line) => {
                    self.line_no += 1;
                    return Ok(Some(line));
                }
                None => {
                    log::debug!("{}: end of feed after {} lines", self.source, self.line_no);
                    return Ok(None);
                }
            }
        }
    }

    fn probe(&self) -> Result<()> {
        log::debug!("{}: idle at line {}", self.source, self.line_no);
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        log::warn!("{}: stream feeds cannot reconnect, continuing", self.source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[tokio::test]
    async fn test_channel_feed_delivers_then_closes() {
        let (tx, mut feed) = ChannelFeed::new(4);
        tx.send("a".into()).await.unwrap();
        drop(tx);
        assert_eq!(feed.recv().await.unwrap(), Some("a".into()));
        assert_eq!(feed.recv().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_recv_survives_timeout() {
        let (tx, mut feed) = ChannelFeed::new(4);
        let timed_out = tokio::time::timeout(Duration::from_secs(60), feed.recv()).await;
        assert!(timed_out.is_err());

        feed.probe().unwrap();
        feed.reconnect().await.unwrap();
        feed.reconnect().await.unwrap();
        tx.send("b".into()).await.unwrap();
        assert_eq!(feed.recv().await.unwrap(), Some("b".into()));

        let counters = feed.counters();
        assert_eq!(counters.probes(), 1);
        assert_eq!(counters.reconnects(), 2);
    }

    #[tokio::test]
    async fn test_line_feed_skips_blank_lines() {
        let input: &[u8] = b"{\"a\":1}\n\n   \n{\"b\":2}\n";
        let mut feed = LineFeed::new(input, "memory");
        assert_eq!(feed.recv().await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(feed.recv().await.unwrap().as_deref(), Some("{\"b\":2}"));
        assert_eq!(feed.recv().await.unwrap(), None);
        assert!(feed.reconnect().await.is_ok());
    }

    #[tokio::test]
    async fn test_line_feed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();

        let mut feed = LineFeed::open(file.path()).await.unwrap();
        assert_eq!(feed.recv().await.unwrap().as_deref(), Some("first"));
        assert_eq!(feed.recv().await.unwrap().as_deref(), Some("second"));
        assert_eq!(feed.recv().await.unwrap(), None);
    }
}
