use crate::circular_buffer::CircularBuffer;
use crate::config::{Config, OverflowPolicy};
use crate::error::Error;
use crate::sources::ByteSource;
use futures::future::try_join;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Bytes read from the source.
    pub bytes_in: u64,
    /// Bytes the buffer accepted.
    pub bytes_staged: u64,
    /// Bytes lost to the overflow policy, either overwritten or rejected.
    pub bytes_dropped: u64,
    /// Bytes written to the sink.
    pub bytes_out: u64,
}

/// Moves bytes from a source to a sink through one shared `CircularBuffer`.
pub struct Pump {
    buffer: Arc<Mutex<CircularBuffer>>,
    policy: OverflowPolicy,
    chunk_size: usize,
    drain_size: usize,
    interval: Duration,
    staged: Notify,
    producer_done: AtomicBool,
}

impl Pump {
    /// Fails with [`Error::Config`] when `chunk_size` or `drain_size` is zero.
    pub fn new(
        buffer: Arc<Mutex<CircularBuffer>>,
        policy: OverflowPolicy,
        chunk_size: usize,
        drain_size: usize,
        interval: Duration,
    ) -> Result<Self, Error> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be greater than zero".into()));
        }
        if drain_size == 0 {
            return Err(Error::Config("drain size must be greater than zero".into()));
        }
        Ok(Self {
            buffer,
            policy,
            chunk_size,
            drain_size,
            interval,
            staged: Notify::new(),
            producer_done: AtomicBool::new(false),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, Error> {
        cfg.validate()?;
        let buffer = CircularBuffer::new(cfg.buffer.capacity)?;
        Self::new(
            Arc::new(Mutex::new(buffer)),
            cfg.policy()?,
            cfg.input.chunk_size,
            cfg.output.drain_size,
            Duration::from_millis(cfg.output.interval_ms),
        )
    }

    pub fn buffer(&self) -> Arc<Mutex<CircularBuffer>> {
        Arc::clone(&self.buffer)
    }

    /// Returns `(accepted, dropped)` for one chunk.
    fn stage(&self, buf: &mut CircularBuffer, chunk: &[u8]) -> Result<(usize, usize), Error> {
        let excess = chunk.len().saturating_sub(buf.available());
        match self.policy {
            OverflowPolicy::Overwrite => {
                let accepted = buf.push_many(chunk)?;
                Ok((accepted, excess))
            }
            OverflowPolicy::Reject => {
                let accepted = buf.push_many_no_overwrite(chunk)?;
                Ok((accepted, excess))
            }
        }
    }

    async fn produce<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<PumpStats, Error> {
        let mut stats = PumpStats::default();
        loop {
            let chunk = source.read_chunk(self.chunk_size).await?;
            if chunk.is_empty() {
                break;
            }
            let (accepted, dropped) = {
                let mut buf = self.buffer.lock().await;
                self.stage(&mut buf, &chunk)?
            };
            if dropped > 0 {
                log::debug!("Dropped {} bytes under {:?} policy", dropped, self.policy);
            }
            stats.bytes_in += chunk.len() as u64;
            stats.bytes_staged += accepted as u64;
            stats.bytes_dropped += dropped as u64;
            self.staged.notify_one();
            tokio::task::yield_now().await;
        }
        self.producer_done.store(true, Ordering::Release);
        self.staged.notify_one();
        Ok(stats)
    }

    async fn consume<W>(&self, sink: &mut W) -> Result<u64, Error>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mut scratch = vec![0u8; self.drain_size];
        let mut bytes_out = 0u64;
        loop {
            let n = self.buffer.lock().await.pop_many(&mut scratch)?;
            if n > 0 {
                sink.write_all(&scratch[..n]).await?;
                bytes_out += n as u64;
                if !self.interval.is_zero() {
                    tokio::time::sleep(self.interval).await;
                }
                continue;
            }
            if self.producer_done.load(Ordering::Acquire) {
                // The producer may have staged a last chunk before finishing.
                if self.buffer.lock().await.is_empty() {
                    break;
                }
                continue;
            }
            self.staged.notified().await;
        }
        sink.flush().await?;
        Ok(bytes_out)
    }

    /// Pump `source` into `sink` until the source ends and the buffer is drained.
    pub async fn run<S, W>(&self, source: &mut S, sink: &mut W) -> Result<PumpStats, Error>
    where
        S: ByteSource + ?Sized,
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.producer_done.store(false, Ordering::Release);
        let (mut stats, bytes_out) = try_join(self.produce(source), self.consume(sink)).await?;
        stats.bytes_out = bytes_out;
        Ok(stats)
    }
}
