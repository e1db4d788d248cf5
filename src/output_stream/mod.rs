use bytes::{Bytes, BytesMut};
use std::fmt::{Display, Formatter};

pub mod line_stream_reader;

/// Size of the buffer the background reader fills per read call.
///
/// default: 16 * 1024 // 16 kb
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Represents the type of the stream (stdout or stderr)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    StdOut,
    StdErr,
}

impl Display for StreamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::StdOut => f.write_str("stdout"),
            StreamType::StdErr => f.write_str("stderr"),
        }
    }
}

/// Turns one raw line into the text handed out to callers.
///
/// Leading form-feeds and the trailing line terminator (any run of `\r` and `\n`) are removed.
/// Invalid UTF-8 is replaced, never rejected.
pub(crate) fn clean_line(raw: &[u8]) -> String {
    let start = raw.iter().position(|b| *b != b'\x0c').unwrap_or(raw.len());
    let end = raw
        .iter()
        .rposition(|b| *b != b'\n' && *b != b'\r')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    if start >= end {
        return String::new();
    }
    String::from_utf8_lossy(&raw[start..end]).into_owned()
}

/// Conceptually, this iterator appends the given byte slice to the current line buffer, which may
/// already hold some previously written data.
/// The resulting view of data is split by newlines (`\n`). Every completed line is yielded,
/// still carrying its `\n`.
/// The remainder of the chunk, not completed with a newline character, will become the new content
/// of `line_buffer`.
pub(crate) struct LineSplitter<'c, 'b> {
    chunk: &'c [u8],
    line_buffer: &'b mut BytesMut,
}

impl<'c, 'b> LineSplitter<'c, 'b> {
    pub(crate) fn new(chunk: &'c [u8], line_buffer: &'b mut BytesMut) -> Self {
        Self { chunk, line_buffer }
    }
}

impl Iterator for LineSplitter<'_, '_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        if self.chunk.is_empty() {
            return None;
        }

        match self.chunk.iter().position(|b| *b == b'\n') {
            None => {
                // No more line breaks - keep the fragment for the next chunk.
                self.line_buffer.extend_from_slice(self.chunk);
                self.chunk = &[];
                None
            }
            Some(pos) => {
                let (line, rest) = self.chunk.split_at(pos + 1);
                self.line_buffer.extend_from_slice(line);
                self.chunk = rest;
                Some(self.line_buffer.split().freeze())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{LineSplitter, StreamType, clean_line};
    use assertr::prelude::*;
    use bytes::BytesMut;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

    pub(crate) async fn write_test_data(mut write: impl AsyncWrite + Unpin) {
        write.write_all("pig.log\n".as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        write.write_all("\x0cjob_0001 started\r\n".as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        write.write_all("job_0001 ".as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        write.write_all("succeeded\n\n".as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        write.write_all("done".as_bytes()).await.unwrap();
    }

    /// A stream whose every read fails.
    pub(crate) struct BrokenStream;

    impl AsyncRead for BrokenStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream is broken",
            )))
        }
    }

    #[test]
    fn cleans_lines() {
        assert_that(clean_line(b"plain\n")).is_equal_to("plain");
        assert_that(clean_line(b"windows\r\n")).is_equal_to("windows");
        assert_that(clean_line(b"\x0c\x0cpage\n")).is_equal_to("page");
        assert_that(clean_line(b"many\r\n\n")).is_equal_to("many");
        assert_that(clean_line(b"\n")).is_equal_to("");
        assert_that(clean_line(b"\x0c\n")).is_equal_to("");
        assert_that(clean_line(b"no terminator")).is_equal_to("no terminator");
        assert_that(clean_line(b"inner\x0cfeed\n")).is_equal_to("inner\x0cfeed");
    }

    #[test]
    fn replaces_invalid_utf8() {
        let line = clean_line(b"valid utf8\xF0\x28\x8C\xBC invalid utf8\n");
        assert_that(line.as_str()).contains("valid utf8");
        assert_that(line.as_str()).contains("invalid utf8");
    }

    #[test]
    fn splits_chunks_into_lines() {
        fn split(chunk: &[u8], initial: &[u8]) -> (Vec<Vec<u8>>, Vec<u8>) {
            let mut line_buffer = BytesMut::from(initial);
            let lines = LineSplitter::new(chunk, &mut line_buffer)
                .map(|line| line.to_vec())
                .collect::<Vec<_>>();
            (lines, line_buffer.to_vec())
        }

        let (lines, rest) = split(b"", b"existing: ");
        assert_that(lines).is_empty();
        assert_that(rest).is_equal_to(b"existing: ".to_vec());

        let (lines, rest) = split(b"no newline", b"existing: ");
        assert_that(lines).is_empty();
        assert_that(rest).is_equal_to(b"existing: no newline".to_vec());

        let (lines, rest) = split(b"first\nsecond\n", b"");
        assert_that(lines).is_equal_to(vec![b"first\n".to_vec(), b"second\n".to_vec()]);
        assert_that(rest).is_empty();

        let (lines, rest) = split(b"tail\nnext", b"head ");
        assert_that(lines).is_equal_to(vec![b"head tail\n".to_vec()]);
        assert_that(rest).is_equal_to(b"next".to_vec());

        let (lines, rest) = split(b"\n\n", b"");
        assert_that(lines).is_equal_to(vec![b"\n".to_vec(), b"\n".to_vec()]);
        assert_that(rest).is_empty();
    }

    #[test]
    fn displays_stream_names() {
        assert_that(StreamType::StdOut.to_string()).is_equal_to("stdout");
        assert_that(StreamType::StdErr.to_string()).is_equal_to("stderr");
    }
}
