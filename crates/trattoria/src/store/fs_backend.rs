use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Writer, WriterBuilder};
use log::{debug, warn};
use uuid::Uuid;

use super::backend::RelationBackend;
use super::{Relation, Row};
use crate::error::{Result, StoreError};

/// Relations stored as comma-separated files under one data directory.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn relation_path(&self, relation: Relation) -> PathBuf {
        self.root.join(relation.file_name())
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(StoreError::Io)?;
        }
        Ok(())
    }

    /// Write a fresh copy of `target` next to it, then rename it into place.
    ///
    /// If `fill` or any later step fails, the temporary file is removed and
    /// `target` keeps its previous contents.
    fn write_atomically<F>(&self, target: &Path, fill: F) -> Result<()>
    where
        F: FnOnce(&mut Writer<File>) -> Result<()>,
    {
        let stem = target
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("relation");
        let tmp_path = self.root.join(format!(".{}-{}.tmp", stem, Uuid::new_v4()));

        let written = fill_temp(&tmp_path, fill)
            .and_then(|_| fs::rename(&tmp_path, target).map_err(StoreError::Io));
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
            return written;
        }
        sync_dir(&self.root)
    }
}

fn fill_temp<F>(tmp_path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut Writer<File>) -> Result<()>,
{
    let file = File::create(tmp_path).map_err(StoreError::Io)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    fill(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    file.sync_all().map_err(StoreError::Io)?;
    Ok(())
}

/// Where the CSV reader stands after the last byte of a relation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    /// At the start of a record.
    Complete,
    /// Inside an unterminated record, outside quotes.
    OpenRecord,
    /// Inside a quoted field that was never closed.
    OpenQuote,
}

impl Tail {
    /// Bytes that end a torn last record so the next one starts on its own.
    fn terminator(self) -> &'static [u8] {
        match self {
            Tail::Complete => b"",
            Tail::OpenRecord => b"\n",
            Tail::OpenQuote => b"\"\n",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Follow the quoting rules of the `csv` reader: a quote opens a field only
/// at its start, `""` inside quotes is a literal quote.
fn scan_tail(bytes: &[u8]) -> Tail {
    let mut state = Scan::FieldStart;
    let mut in_record = false;
    for &byte in bytes {
        state = match (state, byte) {
            (Scan::Quoted, b'"') => Scan::QuoteInQuoted,
            (Scan::Quoted, _) => Scan::Quoted,
            (Scan::QuoteInQuoted, b'"') => Scan::Quoted,
            (_, b'\n') | (_, b'\r') => {
                in_record = false;
                Scan::FieldStart
            }
            (_, b',') => Scan::FieldStart,
            (Scan::FieldStart, b'"') => Scan::Quoted,
            _ => Scan::Unquoted,
        };
        if state != Scan::FieldStart || byte == b',' {
            in_record = true;
        }
    }
    match state {
        Scan::Quoted => Tail::OpenQuote,
        _ if in_record => Tail::OpenRecord,
        _ => Tail::Complete,
    }
}

fn read_tail(file: &mut File) -> Result<Tail> {
    file.seek(SeekFrom::Start(0)).map_err(StoreError::Io)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(StoreError::Io)?;
    Ok(scan_tail(&bytes))
}

/// Flush directory metadata so a completed rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(StoreError::Io)
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

impl RelationBackend for FsBackend {
    fn ensure(&self, relation: Relation) -> Result<()> {
        self.ensure_dir()?;
        let path = self.relation_path(relation);
        if path.exists() {
            return Ok(());
        }
        debug!("creating {} relation at {}", relation, path.display());
        self.write_atomically(&path, |writer| {
            writer.write_record(relation.header())?;
            Ok(())
        })
    }

    fn load_all(&self, relation: Relation) -> Result<Vec<Row>> {
        let file = File::open(self.relation_path(relation)).map_err(StoreError::Io)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut rows = Vec::new();
        for record in reader.records() {
            match record {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                Err(e) if e.is_io_error() => return Err(StoreError::Csv(e)),
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    warn!("skipping unreadable {} row at line {}: {}", relation, line, e);
                }
            }
        }
        Ok(rows)
    }

    fn append_one(&self, relation: Relation, row: &[String]) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(self.relation_path(relation))
            .map_err(StoreError::Io)?;

        // A crash or a hand edit may leave a torn last record; close it off so
        // it stays one corrupt row instead of swallowing the ones appended next.
        let tail = read_tail(&mut file)?;
        if tail != Tail::Complete {
            warn!("closing torn last {} row before appending", relation);
            file.write_all(tail.terminator()).map_err(StoreError::Io)?;
        }

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(row)?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        file.sync_all().map_err(StoreError::Io)?;
        Ok(())
    }

    fn rewrite_all(&self, relation: Relation, rows: &[Row]) -> Result<()> {
        debug!("rewriting {} relation with {} rows", relation, rows.len());
        let path = self.relation_path(relation);
        self.write_atomically(&path, |writer| {
            writer.write_record(relation.header())?;
            for row in rows {
                writer.write_record(row)?;
            }
            Ok(())
        })
    }
}
