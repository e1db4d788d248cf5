use crate::error::CloseError;
use crate::output_stream::{DEFAULT_CHUNK_SIZE, LineSplitter, StreamType, clean_line};
use bytes::BytesMut;
use std::fmt::{Debug, Formatter};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A non-blocking, line-oriented view over one output stream of a process.
///
/// Construction spawns a background task that owns the stream, reads it until EOF and queues
/// every line it sees. Callers fetch queued lines with [LineStreamReader::try_read_line], which
/// never waits longer than asked for. Because the stream is always being drained, the writing
/// process never stalls on a full pipe buffer, no matter how rarely the queue is polled.
///
/// Lines of one stream are queued in the order they were written.
///
/// Dropping the reader aborts the background task.
pub struct LineStreamReader {
    ty: StreamType,

    /// Resolves to the reason the background task stopped. `None` once joined by `close`.
    stream_reader: Option<JoinHandle<io::Result<()>>>,

    receiver: mpsc::UnboundedReceiver<String>,
}

impl Debug for LineStreamReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStreamReader")
            .field("ty", &self.ty)
            .field("stream_reader", &"non-debug < JoinHandle<io::Result<()>> >")
            .field(
                "receiver",
                &"non-debug < tokio::sync::mpsc::UnboundedReceiver<String> >",
            )
            .finish()
    }
}

impl Drop for LineStreamReader {
    fn drop(&mut self) {
        if let Some(stream_reader) = self.stream_reader.take() {
            stream_reader.abort();
        }
    }
}

async fn read_lines<S: AsyncRead + Unpin + Send + 'static>(
    mut stream: S,
    ty: StreamType,
    chunk_size: usize,
    sender: mpsc::UnboundedSender<String>,
) -> io::Result<()> {
    let mut buf = BytesMut::with_capacity(chunk_size);
    let mut line_buffer = BytesMut::new();
    loop {
        let bytes_read = match stream.read_buf(&mut buf).await {
            Ok(bytes_read) => bytes_read,
            Err(err) => {
                tracing::warn!(stream = %ty, error = %err, "Could not read from stream");
                return Err(err);
            }
        };

        if bytes_read == 0 {
            // EOF. A last line may lack its terminator.
            if !line_buffer.is_empty() {
                let _ = sender.send(clean_line(&line_buffer));
            }
            break;
        }

        let chunk = buf.split();
        for line in LineSplitter::new(&chunk, &mut line_buffer) {
            if sender.send(clean_line(&line)).is_err() {
                // The reader was dropped. Nobody is interested in further lines.
                tracing::debug!(stream = %ty, "Line receiver dropped, stopping reader");
                return Ok(());
            }
        }
        buf.reserve(chunk_size);
    }

    drop(stream);
    tracing::trace!(stream = %ty, "Reached end of stream");
    Ok(())
}

impl LineStreamReader {
    /// Starts reading `stream` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S: AsyncRead + Unpin + Send + 'static>(stream: S, ty: StreamType) -> Self {
        Self::start_with_chunk_size(stream, ty, DEFAULT_CHUNK_SIZE)
    }

    pub fn start_with_chunk_size<S: AsyncRead + Unpin + Send + 'static>(
        stream: S,
        ty: StreamType,
        chunk_size: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<String>();
        let stream_reader = tokio::spawn(read_lines(stream, ty, chunk_size.max(1), sender));

        Self {
            ty,
            stream_reader: Some(stream_reader),
            receiver,
        }
    }

    pub fn ty(&self) -> StreamType {
        self.ty
    }

    /// Returns the next queued line, or `None` if no line is available.
    ///
    /// - With `timeout: None`, the queue is checked once and this returns immediately.
    /// - With `timeout: Some(t)`, this waits up to `t` for a line to arrive.
    ///
    /// This function is cancel safe.
    pub async fn try_read_line(&mut self, timeout: Option<Duration>) -> Option<String> {
        match timeout {
            None => self.receiver.try_recv().ok(),
            Some(timeout) => tokio::time::timeout(timeout, self.receiver.recv())
                .await
                .ok()
                .flatten(),
        }
    }

    /// Waits for the next line.
    ///
    /// Returns `None` once the background reader stopped and every queued line was handed out.
    ///
    /// This function is cancel safe.
    pub async fn next_line(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Checks if the background reader has stopped.
    ///
    /// Lines it queued before stopping may still be waiting to be read.
    pub fn is_finished(&self) -> bool {
        self.stream_reader
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(true)
    }

    /// Releases the stream once the background reader has stopped.
    ///
    /// Fails with [CloseError::Busy] while the reader is still running, which means more data
    /// may still arrive. Drain the queue and try again. Any other error reports why the reader
    /// stopped early: the stream could not be read, or the task was lost.
    ///
    /// Lines queued before closing can still be read afterwards. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), CloseError> {
        let Some(stream_reader) = self.stream_reader.take() else {
            return Ok(());
        };
        if !stream_reader.is_finished() {
            self.stream_reader = Some(stream_reader);
            return Err(CloseError::Busy {
                stream: self.ty,
            });
        }

        match stream_reader.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(CloseError::Read {
                stream: self.ty,
                source,
            }),
            Err(source) => Err(CloseError::Join {
                stream: self.ty,
                source,
            }),
        }
    }
}
