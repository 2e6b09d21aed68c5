//! Bounded line reading over buffered async streams.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Error type for line reads.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// `limit` bytes were consumed without finding a newline.
    #[error("line exceeds {limit} bytes")]
    TooLong { limit: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read one `\n`-terminated line into `buf`, appending at most `limit` bytes.
///
/// Returns the number of bytes read; `0` means the stream is at EOF. The
/// terminator is kept. A final line cut short by EOF is returned as-is.
pub async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> Result<usize, LineError>
where
    R: AsyncBufRead + Unpin,
{
    let n = (&mut *reader).take(limit as u64).read_until(b'\n', buf).await?;
    if n == limit && !buf.ends_with(b"\n") {
        return Err(LineError::TooLong { limit });
    }
    Ok(n)
}

/// True for `\r\n` or a bare `\n`.
pub fn is_blank(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Strip a trailing `\n` or `\r\n`.
pub fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn reads_lines_with_terminators() {
        let mut reader = BufReader::new(&b"GET / HTTP/1.0\r\nHost: a\r\n\r\n"[..]);
        let mut buf = Vec::new();

        assert_eq!(read_line(&mut reader, &mut buf, 64).await.unwrap(), 16);
        assert_eq!(buf, b"GET / HTTP/1.0\r\n");

        buf.clear();
        read_line(&mut reader, &mut buf, 64).await.unwrap();
        assert_eq!(buf, b"Host: a\r\n");

        buf.clear();
        read_line(&mut reader, &mut buf, 64).await.unwrap();
        assert!(is_blank(&buf));

        buf.clear();
        assert_eq!(read_line(&mut reader, &mut buf, 64).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn over_long_line_fails_explicitly() {
        let mut reader = BufReader::new(&b"0123456789abcdef\r\n"[..]);
        let mut buf = Vec::new();
        let err = read_line(&mut reader, &mut buf, 8).await.unwrap_err();
        assert!(matches!(err, LineError::TooLong { limit: 8 }));
    }

    #[tokio::test]
    async fn line_exactly_at_limit_is_accepted() {
        let mut reader = BufReader::new(&b"abc\r\nrest"[..]);
        let mut buf = Vec::new();
        assert_eq!(read_line(&mut reader, &mut buf, 5).await.unwrap(), 5);
        assert_eq!(buf, b"abc\r\n");
    }

    #[tokio::test]
    async fn partial_line_at_eof_is_returned() {
        let mut reader = BufReader::new(&b"no newline"[..]);
        let mut buf = Vec::new();
        assert_eq!(read_line(&mut reader, &mut buf, 64).await.unwrap(), 10);
        assert_eq!(buf, b"no newline");
    }

    #[test]
    fn terminators() {
        assert_eq!(trim_terminator(b"a: b\r\n"), b"a: b");
        assert_eq!(trim_terminator(b"a: b\n"), b"a: b");
        assert_eq!(trim_terminator(b"a: b"), b"a: b");
        assert!(is_blank(b"\n"));
        assert!(!is_blank(b" \r\n"));
    }
}
