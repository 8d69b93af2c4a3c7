// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Tbpol Authors

//! Streams a serialized policy into a byte sink.
//!
//! A sink may accept fewer bytes than offered on any single call, so the
//! emitter keeps offering the unwritten tail until the whole record has
//! been accepted. A sink that accepts zero bytes is treated as a fatal
//! error rather than retried forever.

use crate::policy::{Policy, PolicyError};
use log::debug;
use std::io::{ErrorKind, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitterError {
    #[error("{0}")]
    Policy(#[from] PolicyError),

    #[error("sink accepted 0 bytes with {remaining} bytes left to write")]
    ZeroProgressWrite { remaining: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes `policy` and drains it into `sink`.
///
/// Returns the number of bytes written, which on success always equals
/// [`Policy::encoded_len`].
pub fn write_policy<W: Write>(
    sink: &mut W,
    policy: &Policy,
) -> Result<usize, EmitterError> {
    let buffer = policy.to_bytes()?;
    write_bytes(sink, &buffer)
}

/// Drains an already-serialized policy record into `sink`, retrying
/// partial writes until the full buffer has been accepted.
pub fn write_bytes<W: Write>(
    sink: &mut W,
    buffer: &[u8],
) -> Result<usize, EmitterError> {
    let mut written = 0;
    while written < buffer.len() {
        match sink.write(&buffer[written..]) {
            Ok(0) => {
                return Err(EmitterError::ZeroProgressWrite {
                    remaining: buffer.len() - written,
                })
            }
            Ok(n) => {
                written += n;
                debug!(
                    "sink accepted {n} bytes, {written}/{} written",
                    buffer.len()
                );
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    sink.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::catalog;
    use std::io::{Error, Read, Result, Seek, SeekFrom};

    /// Sink that accepts at most `max_per_call` bytes per write call.
    struct ShortSink {
        accepted: Vec<u8>,
        max_per_call: usize,
        calls: usize,
    }

    impl ShortSink {
        fn new(max_per_call: usize) -> Self {
            Self {
                accepted: Vec::new(),
                max_per_call,
                calls: 0,
            }
        }
    }

    impl Write for ShortSink {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.calls += 1;
            let n = buf.len().min(self.max_per_call);
            self.accepted.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Sink that never makes progress.
    struct StuckSink;

    impl Write for StuckSink {
        fn write(&mut self, _buf: &[u8]) -> Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Sink that reports an interrupted call before each accepted write.
    struct InterruptingSink {
        accepted: Vec<u8>,
        interrupt_next: bool,
    }

    impl Write for InterruptingSink {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(Error::from(ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            self.accepted.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_policy_full() {
        let policy = catalog::select(false);
        let mut sink = ShortSink::new(usize::MAX);
        let written = write_policy(&mut sink, policy).unwrap();
        assert_eq!(written, policy.encoded_len());
        assert_eq!(sink.accepted, policy.to_bytes().unwrap());
        assert_eq!(sink.calls, 1);
    }

    #[test]
    fn test_short_writes_are_retried() {
        let policy = catalog::select(false);
        let buffer = policy.to_bytes().unwrap();
        let mut sink = ShortSink::new(5);
        let written = write_bytes(&mut sink, &buffer).unwrap();
        assert_eq!(written, buffer.len());
        // 28 bytes at 5 per call
        assert_eq!(sink.calls, buffer.len().div_ceil(5));
        assert_eq!(sink.accepted, buffer);
    }

    #[test]
    fn test_single_byte_sink() {
        let policy = catalog::select(true);
        let buffer = policy.to_bytes().unwrap();
        let mut sink = ShortSink::new(1);
        let written = write_bytes(&mut sink, &buffer).unwrap();
        assert_eq!(written, buffer.len());
        assert_eq!(sink.calls, buffer.len());
        assert_eq!(sink.accepted, buffer);
    }

    #[test]
    fn test_zero_progress_is_fatal() {
        let policy = catalog::select(false);
        let result = write_policy(&mut StuckSink, policy);
        match result {
            Err(EmitterError::ZeroProgressWrite { remaining }) => {
                assert_eq!(remaining, policy.encoded_len());
            }
            other => panic!("Expected ZeroProgressWrite, got {other:?}"),
        }
    }

    #[test]
    fn test_interrupted_writes_are_retried() {
        let policy = catalog::select(false);
        let buffer = policy.to_bytes().unwrap();
        let mut sink = InterruptingSink {
            accepted: Vec::new(),
            interrupt_next: true,
        };
        let written = write_bytes(&mut sink, &buffer).unwrap();
        assert_eq!(written, buffer.len());
        assert_eq!(sink.accepted, buffer);
    }

    #[test]
    fn test_empty_buffer_writes_nothing() {
        let mut sink = ShortSink::new(5);
        let written = write_bytes(&mut sink, &[]).unwrap();
        assert_eq!(written, 0);
        assert_eq!(sink.calls, 0);
    }

    #[test]
    fn test_write_policy_to_file() {
        let policy = catalog::select(false);
        let mut file = tempfile::tempfile().unwrap();
        let written = write_policy(&mut file, policy).unwrap();
        assert_eq!(written, policy.encoded_len());

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = Vec::new();
        let _ = file.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, policy.to_bytes().unwrap());
    }
}
