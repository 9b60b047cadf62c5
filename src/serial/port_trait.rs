//! Trait abstraction for line-oriented serial links to enable testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::{timeout, Duration};
use tracing::trace;

use crate::error::{Result, WheelError};

/// Trait for line-oriented link operations
#[async_trait]
pub trait LineLink: Send {
    /// Read one newline-terminated line, terminator included
    ///
    /// A read timeout yields whatever arrived before it (possibly an empty
    /// string) rather than an error. End of stream is `LinkClosed`.
    async fn read_line(&mut self) -> Result<String>;

    /// Write all data to the link and flush it
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;
}

/// Line reader/writer over any async byte stream
pub struct StreamLink<S> {
    stream: BufReader<S>,
    read_timeout: Duration,
}

impl<S> StreamLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            read_timeout,
        }
    }

    /// Underlying stream
    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }
}

#[async_trait]
impl<S> LineLink for StreamLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        match timeout(self.read_timeout, self.stream.read_until(b'\n', &mut buf)).await {
            Err(_) => {
                trace!("Line read timed out with {} bytes pending", buf.len());
            }
            Ok(Ok(0)) => return Err(WheelError::LinkClosed),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(WheelError::Serial(format!("Failed to read line: {}", e)));
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .await
            .map_err(|e| WheelError::Serial(format!("Failed to write: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| WheelError::Serial(format!("Failed to flush serial port: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock link replaying scripted lines
    #[derive(Clone, Default)]
    pub struct MockLineLink {
        pub lines: Arc<Mutex<VecDeque<String>>>,
        pub written_data: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MockLineLink {
        pub fn new<I, T>(lines: I) -> Self
        where
            I: IntoIterator<Item = T>,
            T: Into<String>,
        {
            Self {
                lines: Arc::new(Mutex::new(lines.into_iter().map(Into::into).collect())),
                written_data: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn get_written_data(&self) -> Vec<Vec<u8>> {
            self.written_data.lock().unwrap().clone()
        }

        pub fn remaining_lines(&self) -> usize {
            self.lines.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LineLink for MockLineLink {
        async fn read_line(&mut self) -> Result<String> {
            self.lines
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(WheelError::LinkClosed)
        }

        async fn write_all(&mut self, data: &[u8]) -> Result<()> {
            self.written_data.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }
}
