#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Streaming reader for `<size_MB> <duration_seconds>` pairs.
//!
//! Pairs are whitespace separated and may span lines. Input is consumed
//! lazily, so a schedule typed on stdin is ramped as it arrives. The first
//! invalid token ends the schedule.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{info, warn};

use crate::domain::ScheduleEntry;

pub type BoxedInput = Box<dyn AsyncBufRead + Unpin + Send>;

pub struct ScheduleReader<R> {
    lines: Lines<R>,
    pending: VecDeque<String>,
    line_no: usize,
    done: bool,
}

impl<R: AsyncBufRead + Unpin> ScheduleReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: VecDeque::new(),
            line_no: 0,
            done: false,
        }
    }

    /// Next valid entry, or `None` once input ends or turns invalid.
    pub async fn next_entry(&mut self) -> AnyResult<Option<ScheduleEntry>> {
        if self.done {
            return Ok(None);
        }
        let Some(size) = self.next_token().await? else {
            return Ok(self.finish());
        };
        let Some(duration) = self.next_token().await? else {
            warn!(line = self.line_no, size = %size, "schedule ends with a size but no duration");
            return Ok(self.finish());
        };
        let (Ok(size_mb), Ok(duration_secs)) = (size.parse::<i64>(), duration.parse::<i64>())
        else {
            warn!(line = self.line_no, size = %size, duration = %duration, "malformed schedule pair");
            return Ok(self.finish());
        };
        match ScheduleEntry::new(size_mb, duration_secs) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(line = self.line_no, error = %format!("{e:#}"), "rejected schedule pair");
                Ok(self.finish())
            }
        }
    }

    /// Drains the remaining valid entries.
    pub async fn collect(mut self) -> AnyResult<Vec<ScheduleEntry>> {
        let mut out = Vec::new();
        while let Some(entry) = self.next_entry().await? {
            out.push(entry);
        }
        Ok(out)
    }

    async fn next_token(&mut self) -> AnyResult<Option<String>> {
        while self.pending.is_empty() {
            let line = self
                .lines
                .next_line()
                .await
                .with_context(|| format!("read schedule line {}", self.line_no + 1))?;
            let Some(line) = line else {
                return Ok(None);
            };
            self.line_no += 1;
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }
        Ok(self.pending.pop_front())
    }

    fn finish(&mut self) -> Option<ScheduleEntry> {
        self.done = true;
        None
    }
}

/// Opens `path`, or stdin when no path is given.
pub async fn open(path: Option<&Path>) -> AnyResult<ScheduleReader<BoxedInput>> {
    let input: BoxedInput = match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("open schedule {}", path.display()))?;
            info!(path = %path.display(), "reading schedule from file");
            Box::new(BufReader::new(file))
        }
        None => {
            info!("reading schedule from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };
    Ok(ScheduleReader::new(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(input: &str) -> Vec<ScheduleEntry> {
        ScheduleReader::new(input.as_bytes())
            .collect()
            .await
            .expect("read")
    }

    #[tokio::test]
    async fn pairs_per_line() {
        let got = parse("30 30\n15 60\n15 30\n").await;
        let sizes: Vec<_> = got.iter().map(|e| (e.size_mb, e.duration_secs)).collect();
        assert_eq!(sizes, vec![(30, 30), (15, 60), (15, 30)]);
    }

    #[tokio::test]
    async fn pair_may_span_lines() {
        let got = parse("  8\n\n 2 4 1").await;
        assert_eq!(got.len(), 2);
        assert_eq!((got[1].size_mb, got[1].duration_secs), (4, 1));
    }

    #[tokio::test]
    async fn duration_below_one_is_clamped() {
        let got = parse("5 0\n5 -3").await;
        assert!(got.iter().all(|e| e.duration_secs == 1));
    }

    #[tokio::test]
    async fn malformed_token_ends_schedule() {
        let got = parse("1 1\nx 2\n3 3\n").await;
        assert_eq!(got.len(), 1);
    }

    #[tokio::test]
    async fn negative_size_ends_schedule() {
        let got = parse("1 1\n-4 2\n3 3\n").await;
        assert_eq!(got.len(), 1);
    }

    #[tokio::test]
    async fn dangling_size_is_dropped() {
        let got = parse("1 1 7").await;
        assert_eq!(got.len(), 1);
    }
}
