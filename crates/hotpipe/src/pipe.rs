//! Line pipe: drops recently seen lines and batches the rest to a sink

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use hotcache::HotCache;
use hotwriter::BufferedWriter;
use tracing::debug;

use crate::config::PipeConfig;

/// Counters reported after a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Lines read from the input
    pub lines_in: u64,
    /// Lines forwarded to the sink
    pub lines_written: u64,
    /// Lines dropped as recent duplicates
    pub duplicates: u64,
    /// Bytes forwarded to the sink, newlines included
    pub bytes_out: u64,
    /// Buffers the writer had to allocate
    pub buffers_allocated: u64,
    /// Buffers the writer took back from its pool
    pub buffers_reused: u64,
    /// Hit ratio of the duplicate cache
    pub dedup_hit_ratio: f64,
}

/// Deduplicating line pipe over a buffered sink
pub struct Pipe<W> {
    writer: BufferedWriter<W>,
    seen: HotCache<Vec<u8>, ()>,
    summary: Summary,
}

impl<W> Pipe<W>
where
    W: Write + Send + 'static,
{
    /// Build a pipe writing to `sink`
    pub fn new(sink: W, config: &PipeConfig) -> Result<Self> {
        let writer = BufferedWriter::with_config(sink, config.writer.clone())
            .context("starting buffered writer")?;
        debug!(
            buffer = config.writer.buffer_capacity,
            dedup_entries = config.dedup.max_entries,
            dedup_ttl_ms = config.dedup.ttl_ms,
            "pipe ready"
        );

        Ok(Self {
            writer,
            seen: HotCache::with_config(&config.dedup),
            summary: Summary::default(),
        })
    }

    /// Handle one line, without its terminator
    ///
    /// Lines are compared as raw bytes, so input need not be UTF-8.
    pub fn feed(&mut self, line: &[u8]) -> Result<()> {
        self.summary.lines_in += 1;

        let key = line.to_vec();
        if self.seen.get(&key).is_some() {
            self.summary.duplicates += 1;
            return Ok(());
        }
        self.seen.set(key, ());

        self.writer.write(line)?;
        self.writer.write(b"\n")?;
        self.summary.lines_written += 1;
        self.summary.bytes_out += line.len() as u64 + 1;
        Ok(())
    }

    /// Feed every line of `input`, then flush
    ///
    /// Lines end at `\n`; a trailing `\r` is dropped as well.
    pub fn run<R: BufRead>(mut self, mut input: R) -> Result<(W, Summary)> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = input
                .read_until(b'\n', &mut line)
                .context("reading input")?;
            if read == 0 {
                break;
            }
            self.feed(strip_terminator(&line))?;
        }
        self.finish()
    }

    /// Flush everything to the sink and hand it back
    pub fn finish(self) -> Result<(W, Summary)> {
        let Pipe {
            writer,
            seen,
            mut summary,
        } = self;

        summary.buffers_allocated = writer.pool_stats().allocated();
        summary.buffers_reused = writer.pool_stats().reused();
        summary.dedup_hit_ratio = seen.stats().hit_ratio();

        let sink = writer.wait_clean().context("flushing output")?;
        Ok((sink, summary))
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotcache::CacheConfig;
    use hotwriter::WriterConfig;
    use std::io::Cursor;
    use std::time::Duration;

    fn config(buffer: usize, dedup_entries: usize) -> PipeConfig {
        PipeConfig {
            writer: WriterConfig::with_capacity(buffer),
            dedup: CacheConfig::new(dedup_entries, Duration::from_secs(60)),
        }
    }

    #[test]
    fn test_duplicates_dropped() {
        let pipe = Pipe::new(Vec::new(), &config(16, 100)).unwrap();
        let input = Cursor::new("a\nb\na\nc\nb\n");

        let (out, summary) = pipe.run(input).unwrap();

        assert_eq!(out, b"a\nb\nc\n");
        assert_eq!(summary.lines_in, 5);
        assert_eq!(summary.lines_written, 3);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.bytes_out, 6);
    }

    #[test]
    fn test_zero_capacity_cache_disables_dedup() {
        let pipe = Pipe::new(Vec::new(), &config(16, 0)).unwrap();

        let (out, summary) = pipe.run(Cursor::new("x\nx\nx\n")).unwrap();

        assert_eq!(out, b"x\nx\nx\n");
        assert_eq!(summary.duplicates, 0);
    }

    #[test]
    fn test_evicted_lines_pass_again() {
        let pipe = Pipe::new(Vec::new(), &config(16, 1)).unwrap();

        let (out, _) = pipe.run(Cursor::new("a\nb\na\n")).unwrap();

        assert_eq!(out, b"a\nb\na\n");
    }

    #[test]
    fn test_many_lines_reuse_buffers() {
        let mut pipe = Pipe::new(Vec::new(), &config(32, 10)).unwrap();
        let mut expected = String::new();
        for i in 0..1_000 {
            let line = format!("event-{i}");
            expected.push_str(&line);
            expected.push('\n');
            pipe.feed(line.as_bytes()).unwrap();
        }

        let (out, summary) = pipe.finish().unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), expected);
        assert!(summary.buffers_reused > 0);
        assert_eq!(summary.dedup_hit_ratio, 0.0);
    }

    #[test]
    fn test_non_utf8_lines_pass_through() {
        let pipe = Pipe::new(Vec::new(), &config(16, 100)).unwrap();
        let input = Cursor::new(b"ok\n\xff\xfe raw\n\xff\xfe raw\nlast".to_vec());

        let (out, summary) = pipe.run(input).unwrap();

        assert_eq!(out, b"ok\n\xff\xfe raw\nlast\n");
        assert_eq!(summary.lines_in, 4);
        assert_eq!(summary.duplicates, 1);
    }

    #[test]
    fn test_crlf_matches_lf() {
        let pipe = Pipe::new(Vec::new(), &config(16, 100)).unwrap();

        let (out, summary) = pipe.run(Cursor::new("a\r\na\n")).unwrap();

        assert_eq!(out, b"a\n");
        assert_eq!(summary.duplicates, 1);
    }

    #[test]
    fn test_zero_buffer_rejected() {
        assert!(Pipe::new(Vec::new(), &config(0, 10)).is_err());
    }
}
