// src/extract.rs

use anyhow::{bail, Context, Result};
use csv::{ByteRecord, Reader, ReaderBuilder};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    time::Instant,
};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::record::{CsvNameRow, NameRecord};

/// Lazy row source over a CSV reader.
///
/// Yields one `NameRecord` per row that carries both `Name` and `Sex`. Cells
/// are decoded lossily, so a stray non-UTF-8 byte never costs a row. Rows
/// missing either field, or rows the parser rejects, are counted in
/// [`NameRows::skipped`] and never surface. I/O errors from the underlying
/// reader are yielded and should end the iteration.
pub struct NameRows<R: Read> {
    reader: Reader<R>,
    record: ByteRecord,
    columns: Option<(Option<usize>, Option<usize>)>,
    skipped: u64,
}

impl<R: Read> NameRows<R> {
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn columns(&mut self) -> Result<(Option<usize>, Option<usize>)> {
        if let Some(columns) = self.columns {
            return Ok(columns);
        }
        let headers = self.reader.byte_headers().context("reading CSV header")?;
        let find = |name: &str| headers.iter().position(|h| h == name.as_bytes());
        let columns = (find("Name"), find("Sex"));
        if columns.0.is_none() || columns.1.is_none() {
            warn!(?columns, "CSV header lacks Name or Sex");
        }
        self.columns = Some(columns);
        Ok(columns)
    }
}

impl<R: Read> Iterator for NameRows<R> {
    type Item = Result<NameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let (name_col, sex_col) = match self.columns() {
            Ok(columns) => columns,
            Err(e) => return Some(Err(e)),
        };
        loop {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(false) => return None,
                Ok(true) => {
                    match CsvNameRow::from_byte_record(&self.record, name_col, sex_col)
                        .into_record()
                    {
                        Some(record) => return Some(Ok(record)),
                        None => self.skipped += 1,
                    }
                }
                Err(e) if e.is_io_error() => {
                    return Some(Err(anyhow::Error::new(e).context("reading CSV stream")));
                }
                Err(e) => {
                    debug!(error = %e, "skipping malformed CSV row");
                    self.skipped += 1;
                }
            }
        }
    }
}

/// Wrap `reader` as a headed CSV source. Short rows are allowed so that a
/// truncated line counts as a missing field rather than a stream error.
pub fn read_name_rows<R: Read>(reader: R) -> NameRows<R> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    NameRows {
        reader,
        record: ByteRecord::new(),
        columns: None,
        skipped: 0,
    }
}

/// Result of reading one archive.
#[derive(Debug, Default)]
pub struct Extracted {
    pub records: Vec<NameRecord>,
    pub skipped: u64,
    pub entries_seen: usize,
    pub entries_ignored: usize,
}

/// Walk the archive at `archive_path` by index and parse every entry named
/// exactly `entry_name`, decompressing it lazily from the file. Other entries
/// are never opened for reading. Fails if no entry carries the expected name.
#[instrument(level = "info", skip(archive_path), fields(archive = %archive_path.display()))]
pub fn extract_records(archive_path: &Path, entry_name: &str) -> Result<Extracted> {
    let start = Instant::now();
    let file = File::open(archive_path)
        .with_context(|| format!("opening archive {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("reading zip directory of {}", archive_path.display()))?;

    let mut out = Extracted {
        entries_seen: archive.len(),
        ..Extracted::default()
    };
    let mut matched = 0usize;

    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("opening entry {} of {}", i, archive_path.display()))?;
        let name = entry.name().to_string();

        if name != entry_name {
            debug!(entry = %name, size = entry.size(), "ignored entry");
            out.entries_ignored += 1;
            continue;
        }

        matched += 1;
        info!(entry = %name, size = entry.size(), "found target entry, parsing");
        let before = out.records.len();
        let mut rows = read_name_rows(entry);
        for record in rows.by_ref() {
            out.records.push(record.with_context(|| format!("parsing entry {}", name))?);
        }
        out.skipped += rows.skipped();
        info!(
            entry = %name,
            records = out.records.len() - before,
            skipped = rows.skipped(),
            "entry parsed"
        );
    }

    if matched == 0 {
        warn!(entries = out.entries_seen, "target entry missing");
        bail!(
            "archive {} has no entry named {:?} ({} entries seen)",
            archive_path.display(),
            entry_name,
            out.entries_seen
        );
    }

    info!(
        records = out.records.len(),
        skipped = out.skipped,
        elapsed = ?start.elapsed(),
        "archive extracted"
    );
    Ok(out)
}
