//! Recording decorator for an outbound response sink.

use std::io;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::http::{Headers, ResponseWriter, StatusCode};

/// Forwards everything to an inner [`ResponseWriter`] while keeping a copy of
/// the status and body bytes for inspection once the handler is done.
///
/// The status is held back until the first body write (or [`flush`]), so
/// headers changed after [`write_status`] but before any body bytes are still
/// sent. The inner sink sees exactly one status, defaulting to `200 OK` when
/// none was set.
///
/// [`CacheMiddleware`](super::CacheMiddleware) wraps the live response only
/// after the downstream handler has returned, replaying the finished response
/// into it through this writer. It decorates the response as it is handed
/// back, not a sink the handler writes to while running, so that path always
/// produces headers, then status, then a single body write and a flush.
///
/// [`flush`]: ResponseWriter::flush
/// [`write_status`]: ResponseWriter::write_status
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::CaptureWriter;
/// use rttp_cache::http::{Response, ResponseWriter, StatusCode};
///
/// let mut live = Response::default();
/// let mut capture = CaptureWriter::new(&mut live);
/// capture.write_status(StatusCode::Accepted);
/// capture.write_all(b"queued").unwrap();
///
/// assert_eq!(capture.status(), StatusCode::Accepted);
/// assert_eq!(capture.body(), b"queued");
/// drop(capture);
/// assert_eq!(live.payload(), b"queued");
/// ```
pub struct CaptureWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    committed: bool,
    buffer: BytesMut,
}

impl<'a> CaptureWriter<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            status: None,
            committed: false,
            buffer: BytesMut::new(),
        }
    }

    /// The status the handler set, or `200 OK` if it never set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Ok)
    }

    /// Every body byte written so far.
    pub fn body(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the wrapper, releasing the inner sink and returning the
    /// recorded body.
    pub fn into_body(self) -> Bytes {
        self.buffer.freeze()
    }

    // Sends the status to the inner sink the first time it is needed.
    fn commit(&mut self) {
        if !self.committed {
            self.committed = true;
            self.inner.write_status(self.status());
        }
    }
}

impl ResponseWriter for CaptureWriter<'_> {
    fn headers_mut(&mut self) -> &mut Headers {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        if self.committed {
            debug!(
                status = status.as_u16(),
                sent = self.status().as_u16(),
                "status set after body started; ignored"
            );
            return;
        }
        self.status = Some(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commit();
        let written = self.inner.write(buf)?;
        self.buffer.extend_from_slice(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sink that records every call it receives.
    #[derive(Default)]
    struct Spy {
        headers: Headers,
        statuses: Vec<StatusCode>,
        body: Vec<u8>,
        // Status that was in effect when each body chunk arrived.
        status_at_write: Vec<Option<StatusCode>>,
        fail_writes: bool,
    }

    impl ResponseWriter for Spy {
        fn headers_mut(&mut self) -> &mut Headers {
            &mut self.headers
        }

        fn write_status(&mut self, status: StatusCode) {
            self.statuses.push(status);
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
            }
            self.status_at_write.push(self.statuses.last().copied());
            self.body.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    #[test]
    fn status_is_deferred_until_first_write() {
        let mut spy = Spy::default();
        let mut capture = CaptureWriter::new(&mut spy);
        capture.write_status(StatusCode::Created);
        capture.headers_mut().insert("Location", "/items/1");
        drop(capture);
        assert!(spy.statuses.is_empty());
        assert_eq!(spy.headers.get("location"), Some("/items/1"));
    }

    #[test]
    fn first_write_forwards_status_once() {
        let mut spy = Spy::default();
        let mut capture = CaptureWriter::new(&mut spy);
        capture.write_status(StatusCode::Created);
        capture.write_all(b"ab").unwrap();
        capture.write_all(b"cd").unwrap();
        assert_eq!(capture.body(), b"abcd");
        drop(capture);
        assert_eq!(spy.statuses, vec![StatusCode::Created]);
        assert_eq!(spy.status_at_write, vec![Some(StatusCode::Created); 2]);
        assert_eq!(spy.body, b"abcd");
    }

    #[test]
    fn status_defaults_to_ok() {
        let mut spy = Spy::default();
        let mut capture = CaptureWriter::new(&mut spy);
        assert_eq!(capture.status(), StatusCode::Ok);
        capture.write_all(b"x").unwrap();
        drop(capture);
        assert_eq!(spy.statuses, vec![StatusCode::Ok]);
    }

    #[test]
    fn unwritten_status_is_still_reported() {
        let mut spy = Spy::default();
        let mut capture = CaptureWriter::new(&mut spy);
        capture.write_status(StatusCode::Accepted);
        capture.write_status(StatusCode::NoContent);
        assert_eq!(capture.status(), StatusCode::NoContent);
        assert!(capture.body().is_empty());
    }

    #[test]
    fn flush_commits_bodiless_response() {
        let mut spy = Spy::default();
        let mut capture = CaptureWriter::new(&mut spy);
        capture.write_status(StatusCode::NoContent);
        capture.flush().unwrap();
        capture.flush().unwrap();
        drop(capture);
        assert_eq!(spy.statuses, vec![StatusCode::NoContent]);
    }

    #[test]
    fn late_status_is_ignored() {
        let mut spy = Spy::default();
        let mut capture = CaptureWriter::new(&mut spy);
        capture.write_all(b"x").unwrap();
        capture.write_status(StatusCode::InternalServerError);
        assert_eq!(capture.status(), StatusCode::Ok);
        drop(capture);
        assert_eq!(spy.statuses, vec![StatusCode::Ok]);
    }

    #[test]
    fn failed_write_is_not_recorded() {
        let mut spy = Spy {
            fail_writes: true,
            ..Spy::default()
        };
        let mut capture = CaptureWriter::new(&mut spy);
        assert!(capture.write_all(b"lost").is_err());
        assert!(capture.into_body().is_empty());
    }
}
