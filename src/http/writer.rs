//! Outbound response sink abstraction.
//!
//! [`ResponseWriter`] is the write surface a handler's output flows through on
//! its way to the client: a header map, a status line, and body bytes.
//! [`Response`](super::Response) is the real sink; middleware that needs to
//! observe what was written (such as the response cache) wraps a sink in its
//! own implementation and forwards to it.

use std::io;

use super::{Headers, StatusCode};

/// The write surface of an outbound HTTP response.
///
/// Headers may be changed freely until the first body write; implementations
/// that stream to a transport treat the first [`write`](Self::write) as the
/// point where the status line and headers are committed.
pub trait ResponseWriter: Send {
    /// Mutable access to the response header map.
    fn headers_mut(&mut self) -> &mut Headers;

    /// Sets the response status.
    fn write_status(&mut self, status: StatusCode);

    /// Writes a chunk of body bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Commits anything still pending. The default does nothing.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Writes the entire buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}
