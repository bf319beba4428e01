use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use rxsynth_core::{FieldValue, RowSchema};

use crate::errors::{GenerationError, Result};

/// Closed output shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSummary {
    pub file_name: String,
    /// Data rows, header excluded.
    pub rows: u64,
    /// Sum of per-record estimates, header included.
    pub estimated_bytes: u64,
    /// Bytes counted on the way to disk.
    pub bytes_written: u64,
}

/// `<prefix>_<NN>.csv`, numbered from 1.
pub fn shard_file_name(prefix: &str, index: u32) -> String {
    format!("{prefix}_{index:02}.csv")
}

/// Exact byte length of a record as the csv writer emits it: fields quoted
/// only when they hold a delimiter, quote or line break, inner quotes
/// doubled, comma separated, `\n` terminated.
pub fn estimate_record_bytes<'a>(fields: impl IntoIterator<Item = &'a str>) -> u64 {
    let mut total = 0_u64;
    let mut count = 0_u64;
    for field in fields {
        count += 1;
        total += field.len() as u64;
        let mut needs_quotes = false;
        for byte in field.bytes() {
            match byte {
                b'"' => {
                    needs_quotes = true;
                    total += 1;
                }
                b',' | b'\n' | b'\r' => needs_quotes = true,
                _ => {}
            }
        }
        if needs_quotes {
            total += 2;
        }
    }
    total + count.saturating_sub(1) + 1
}

struct OpenShard {
    file_name: String,
    writer: csv::Writer<CountingWriter<BufWriter<File>>>,
    rows: u64,
    estimated_bytes: u64,
}

/// Streams rows into size-capped CSV shards, each with its own header.
///
/// A shard rolls over when the next row would push its byte estimate past
/// the budget, unless the shard is still empty; a single oversized row
/// therefore lands alone in its own shard.
pub struct PartitionedWriter {
    dir: PathBuf,
    prefix: String,
    schema: RowSchema,
    budget_bytes: u64,
    header_bytes: u64,
    next_index: u32,
    current: Option<OpenShard>,
    closed: Vec<ShardSummary>,
    rows_written: u64,
}

impl PartitionedWriter {
    pub fn new(dir: &Path, prefix: &str, schema: RowSchema, budget_bytes: u64) -> Result<Self> {
        if budget_bytes == 0 {
            return Err(GenerationError::InvalidConfig(
                "shard budget must be positive".to_string(),
            ));
        }
        let header_bytes = estimate_record_bytes(schema.header());
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            schema,
            budget_bytes,
            header_bytes,
            next_index: 1,
            current: None,
            closed: Vec::new(),
            rows_written: 0,
        })
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Validate and append one row, opening a new shard when needed.
    pub fn write_row(&mut self, row: &[FieldValue]) -> Result<()> {
        self.schema.check_row(row)?;
        let rendered: Vec<Cow<'_, str>> = row.iter().map(FieldValue::render).collect();
        let estimate = estimate_record_bytes(rendered.iter().map(|field| field.as_ref()));

        let roll = match &self.current {
            None => true,
            Some(shard) => shard.rows > 0 && shard.estimated_bytes + estimate > self.budget_bytes,
        };
        if roll {
            self.finish_current()?;
            self.open_next()?;
        }

        let shard = self.current.as_mut().ok_or_else(|| {
            GenerationError::Io(std::io::Error::other("no open shard"))
        })?;
        shard
            .writer
            .write_record(rendered.iter().map(|field| field.as_bytes()))?;
        shard.rows += 1;
        shard.estimated_bytes += estimate;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and close the open shard; returns every shard written.
    pub fn close(mut self) -> Result<Vec<ShardSummary>> {
        self.finish_current()?;
        Ok(std::mem::take(&mut self.closed))
    }

    /// Release the open shard without finalizing it.
    pub fn abort(&mut self) {
        if let Some(mut shard) = self.current.take() {
            let _ = shard.writer.flush();
            debug!(file = %shard.file_name, rows = shard.rows, "shard abandoned");
        }
    }

    fn open_next(&mut self) -> Result<()> {
        let file_name = shard_file_name(&self.prefix, self.next_index);
        self.next_index += 1;
        let file = File::create(self.dir.join(&file_name))?;
        let counting = CountingWriter::new(BufWriter::new(file));
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(counting);
        writer.write_record(self.schema.header())?;
        self.current = Some(OpenShard {
            file_name,
            writer,
            rows: 0,
            estimated_bytes: self.header_bytes,
        });
        Ok(())
    }

    fn finish_current(&mut self) -> Result<()> {
        let Some(mut shard) = self.current.take() else {
            return Ok(());
        };
        shard.writer.flush()?;
        let counting = shard.writer.into_inner().map_err(|err| err.into_error())?;
        let bytes = counting.bytes_written();
        debug!(
            file = %shard.file_name,
            rows = shard.rows,
            bytes,
            estimated = shard.estimated_bytes,
            "shard closed"
        );
        self.closed.push(ShardSummary {
            file_name: shard.file_name,
            rows: shard.rows,
            estimated_bytes: shard.estimated_bytes,
            bytes_written: bytes,
        });
        Ok(())
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_counts_quotes_and_separators() {
        assert_eq!(estimate_record_bytes(["a", "bc"]), 5);
        assert_eq!(estimate_record_bytes(["a,b"]), 6);
        assert_eq!(estimate_record_bytes(["say \"hi\""]), 13);
        assert_eq!(estimate_record_bytes(["", ""]), 2);
    }
}
