//! Input guard for the line-delimited transport.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Largest accepted JSON-RPC line, in bytes (newline excluded).
pub const MAX_MESSAGE_BYTES: usize = 1 << 20;

/// Wraps a reader and fails with [`io::ErrorKind::InvalidData`] once a line grows past `max`
/// bytes, which ends the session instead of buffering without bound.
#[derive(Debug)]
pub struct LineLimit<R> {
    inner: R,
    max: usize,
    line_len: usize,
}

impl<R> LineLimit<R> {
    pub fn new(inner: R, max: usize) -> Self {
        Self {
            inner,
            max,
            line_len: 0,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for LineLimit<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        for &byte in &buf.filled()[before..] {
            if byte == b'\n' {
                this.line_len = 0;
                continue;
            }
            this.line_len += 1;
            if this.line_len > this.max {
                tracing::warn!(max = this.max, "message line too long, closing session");
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("message exceeds {} bytes", this.max),
                )));
            }
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn short_lines_pass_through() {
        let input = b"{\"a\":1}\n{\"b\":2}\n".as_slice();
        let mut out = Vec::new();
        LineLimit::new(input, 8).read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test]
    async fn newline_resets_the_count() {
        let input = b"1234\n1234\n1234".as_slice();
        let mut out = Vec::new();
        LineLimit::new(input, 4).read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), 14);
    }

    #[tokio::test]
    async fn oversized_line_is_invalid_data() {
        let line = vec![b'x'; 64];
        let mut out = Vec::new();
        let err = LineLimit::new(line.as_slice(), 16)
            .read_to_end(&mut out)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
