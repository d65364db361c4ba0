use crate::config::InputConfig;
use crate::error::Error;
use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

/// Producer side of a staging pump.
#[async_trait]
pub trait ByteSource: Send {
    /// Read up to `max` bytes. An empty chunk means end of stream.
    async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>, Error>;
}

async fn read_some<R: AsyncRead + Unpin>(reader: &mut R, max: usize) -> Result<Vec<u8>, Error> {
    let mut buf = vec![0u8; max];
    let n = reader.read(&mut buf).await?;
    buf.truncate(n);
    Ok(buf)
}

pub struct FileSource {
    file: File,
    loop_on_eof: bool,
}

impl FileSource {
    pub async fn open(path: &str, loop_on_eof: bool) -> Result<Self, Error> {
        let file = File::open(path).await?;
        Ok(Self { file, loop_on_eof })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>, Error> {
        let chunk = read_some(&mut self.file, max).await?;
        if chunk.is_empty() && self.loop_on_eof {
            self.file.seek(tokio::io::SeekFrom::Start(0)).await?;
            // An empty file stays empty after the rewind, which ends the stream.
            return read_some(&mut self.file, max).await;
        }
        Ok(chunk)
    }
}

pub struct StdinSource {
    stdin: tokio::io::Stdin,
}

impl StdinSource {
    pub fn new() -> Self {
        Self { stdin: tokio::io::stdin() }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteSource for StdinSource {
    async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>, Error> {
        read_some(&mut self.stdin, max).await
    }
}

/// In-memory source handing out `data` in chunks.
pub struct SliceSource {
    data: Vec<u8>,
    pos: usize,
}

impl SliceSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into(), pos: 0 }
    }
}

#[async_trait]
impl ByteSource for SliceSource {
    async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>, Error> {
        let end = (self.pos + max).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(chunk)
    }
}

/// Open the source named by `cfg`, falling back to stdin when no path is set.
pub async fn open_source(cfg: &InputConfig) -> Result<Box<dyn ByteSource>, Error> {
    match cfg.path.as_deref() {
        Some(path) => {
            log::info!("Reading from {}", path);
            Ok(Box::new(FileSource::open(path, cfg.loop_.unwrap_or(false)).await?))
        }
        None => {
            log::info!("Reading from stdin");
            Ok(Box::new(StdinSource::new()))
        }
    }
}
