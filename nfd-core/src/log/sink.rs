// Buffered line sink that turns a byte stream into platform log records

use std::fmt;
use std::io;

use super::{platform_log, PlatformLog, Priority};

/// Size of the line buffer, terminator slot included.
pub const MAX_BUF_SIZE: usize = 1024;

/// Longest record a single flush can emit.
pub const RECORD_CAPACITY: usize = MAX_BUF_SIZE - 1;

/// Tag of every record emitted by [`LogStreamBuf`].
pub const NATIVE_TAG: &str = "Native";

/// Write destination that delivers text to a log in whole records.
pub trait LineSink {
    /// Append bytes, emitting records as lines complete.
    fn write(&mut self, bytes: &[u8]);

    /// Emit whatever is buffered as one record.
    fn flush(&mut self);
}

/// [`LineSink`] over the platform log.
///
/// Bytes accumulate until a newline, an explicit flush, a full buffer, or drop; each of
/// those emits the pending bytes as one INFO record tagged [`NATIVE_TAG`]. Writes longer
/// than [`RECORD_CAPACITY`] are split at the capacity boundary, never truncated. A
/// character straddling that boundary is carried whole into the next record.
pub struct LogStreamBuf<'a> {
    out: &'a dyn PlatformLog,
    buf: Vec<u8>,
}

impl LogStreamBuf<'static> {
    /// Sink over the process-wide platform log.
    pub fn new() -> Self {
        Self::with_log(platform_log())
    }
}

impl Default for LogStreamBuf<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> LogStreamBuf<'a> {
    /// Sink over an explicit log.
    pub fn with_log(out: &'a dyn PlatformLog) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(RECORD_CAPACITY),
        }
    }

    /// Number of bytes waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn sync(&mut self) {
        self.emit(self.buf.len());
    }

    // Emits `buf[..upto]` as one record and keeps the rest for the next one.
    fn emit(&mut self, upto: usize) {
        if upto == 0 {
            return;
        }
        let record = String::from_utf8_lossy(&self.buf[..upto]);
        self.out.write(Priority::Info, NATIVE_TAG, &record);
        self.buf.drain(..upto);
    }
}

/// Length of the longest prefix of `buf` that does not stop inside a UTF-8 sequence.
fn complete_prefix(buf: &[u8]) -> usize {
    let len = buf.len();
    for back in 1..=len.min(3) {
        let byte = buf[len - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { len - back } else { len };
    }
    len
}

impl LineSink for LogStreamBuf<'_> {
    fn write(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let room = RECORD_CAPACITY - self.buf.len();
            let chunk = &bytes[..bytes.len().min(room)];

            if let Some(newline) = chunk.iter().position(|&b| b == b'\n') {
                self.buf.extend_from_slice(&chunk[..newline]);
                self.sync();
                bytes = &bytes[newline + 1..];
            } else {
                self.buf.extend_from_slice(chunk);
                bytes = &bytes[chunk.len()..];
                if self.buf.len() == RECORD_CAPACITY {
                    match complete_prefix(&self.buf) {
                        0 => self.sync(),
                        split => self.emit(split),
                    }
                }
            }
        }
    }

    fn flush(&mut self) {
        self.sync();
    }
}

impl io::Write for LogStreamBuf<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        LineSink::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        LineSink::flush(self);
        Ok(())
    }
}

impl fmt::Write for LogStreamBuf<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        LineSink::write(self, s.as_bytes());
        Ok(())
    }
}

impl Drop for LogStreamBuf<'_> {
    fn drop(&mut self) {
        self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLog;

    fn messages(log: &MemoryLog) -> Vec<String> {
        log.records().into_iter().map(|r| r.message).collect()
    }

    #[test]
    fn newline_and_flush_emit_records() {
        let log = MemoryLog::new();
        let mut sink = LogStreamBuf::with_log(&log);
        LineSink::write(&mut sink, b"hello ");
        assert!(log.records().is_empty());
        LineSink::write(&mut sink, b"world\npartial");
        assert_eq!(messages(&log), ["hello world"]);
        assert_eq!(sink.pending(), "partial".len());
        LineSink::flush(&mut sink);
        assert_eq!(messages(&log), ["hello world", "partial"]);

        let record = &log.records()[0];
        assert_eq!(record.tag, NATIVE_TAG);
        assert_eq!(record.priority, Priority::Info);
    }

    #[test]
    fn empty_flush_emits_nothing() {
        let log = MemoryLog::new();
        let mut sink = LogStreamBuf::with_log(&log);
        LineSink::flush(&mut sink);
        LineSink::write(&mut sink, b"\n\n");
        assert!(log.records().is_empty());
    }

    #[test]
    fn oversized_write_is_split_not_dropped() {
        let log = MemoryLog::new();
        let payload: Vec<u8> = (0..2500).map(|i| b'a' + (i % 26) as u8).collect();
        {
            let mut sink = LogStreamBuf::with_log(&log);
            LineSink::write(&mut sink, &payload);
        }

        let records = messages(&log);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.len() <= RECORD_CAPACITY));
        assert_eq!(records[0].len(), RECORD_CAPACITY);
        assert_eq!(records.concat().as_bytes(), &payload[..]);
    }

    #[test]
    fn character_across_capacity_moves_to_next_record() {
        let log = MemoryLog::new();
        let text = format!("{}€", "a".repeat(RECORD_CAPACITY - 1));
        {
            use std::fmt::Write as _;
            let mut sink = LogStreamBuf::with_log(&log);
            sink.write_str(&text).unwrap();
        }

        let records = messages(&log);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], "a".repeat(RECORD_CAPACITY - 1));
        assert_eq!(records[1], "€");
        assert_eq!(records.concat(), text);
    }

    #[test]
    fn long_multibyte_text_survives_splitting() {
        let log = MemoryLog::new();
        let text = format!("ab{}", "😀é€".repeat(400));
        {
            let mut sink = LogStreamBuf::with_log(&log);
            LineSink::write(&mut sink, text.as_bytes());
        }

        let records = messages(&log);
        assert!(records.len() > 1);
        assert!(records.iter().all(|r| r.len() <= RECORD_CAPACITY));
        assert!(records.iter().all(|r| !r.contains('\u{FFFD}')));
        assert_eq!(records.concat(), text);
    }

    #[test]
    fn drop_flushes_pending_bytes() {
        let log = MemoryLog::new();
        {
            let mut sink = LogStreamBuf::with_log(&log);
            LineSink::write(&mut sink, b"tail without newline");
        }
        assert_eq!(messages(&log), ["tail without newline"]);
    }

    #[test]
    fn formatters_compose_on_top() {
        let log = MemoryLog::new();
        let mut sink = LogStreamBuf::with_log(&log);
        {
            use std::fmt::Write as _;
            writeln!(sink, "faces={} fib={}", 3, 12).unwrap();
        }
        {
            use std::io::Write as _;
            write!(sink, "cs={}", 100).unwrap();
            io::Write::flush(&mut sink).unwrap();
        }
        assert_eq!(messages(&log), ["faces=3 fib=12", "cs=100"]);
    }
}
