//! Intel-HEX file engine (spec.md §4.5).
//!
//! Grounded on `tabre-intelhex`'s line-oriented record model from the
//! example pack, generalized to the random byte-addressed `read_at`/
//! `write_at` access pattern spec.md §4.5 and §6 describe: a flat
//! address space is reconstructed by walking the records once, folding
//! in extended-segment/linear base addresses, then `read_at`/`write_at`
//! locate the covering record(s) by that flat address and patch the
//! underlying ASCII text in place.

mod record;

pub use record::{Record, RecordType};

use std::error::Error;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    WrongRecordFormat(String),
    MultipleEof,
    NoEofRecord,
    AccessOutOfBounds(String),
}

impl Display for HexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HexError::WrongRecordFormat(msg) => write!(f, "wrong record format: {msg}"),
            HexError::MultipleEof => write!(f, "more than one EOF record"),
            HexError::NoEofRecord => write!(f, "missing trailing EOF record"),
            HexError::AccessOutOfBounds(msg) => write!(f, "access out of bounds: {msg}"),
        }
    }
}

impl Error for HexError {}

impl From<record::RecordError> for HexError {
    fn from(e: record::RecordError) -> Self {
        match e {
            record::RecordError::WrongRecordFormat(msg) => HexError::WrongRecordFormat(msg),
        }
    }
}

/// The flat byte-address span a single `Data` record covers, computed
/// once at load time by folding extended-address records into a
/// running base (spec.md §4.5).
struct Span {
    record_index: usize,
    start: u64,
    end: u64,
}

/// Origin metadata recorded at `open()` time so `save()` can write the
/// in-memory bytes back to the same path with the same permissions
/// (spec.md §4.4, §5 "File handles").
pub struct Origin {
    pub path: std::path::PathBuf,
    pub permissions: std::fs::Permissions,
}

pub struct HexFile {
    records: Vec<Record>,
    pub origin: Option<Origin>,
}

impl HexFile {
    pub fn parse(text: &str) -> Result<HexFile, HexError> {
        let mut records = Vec::new();
        let mut eof_count = 0;
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let record = Record::parse(line)?;
            if record.rtype == RecordType::Eof {
                eof_count += 1;
                if eof_count > 1 {
                    return Err(HexError::MultipleEof);
                }
            }
            records.push(record);
        }
        if eof_count == 0 {
            return Err(HexError::NoEofRecord);
        }
        Ok(HexFile { records, origin: None })
    }

    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = Some(origin);
    }

    /// Number of records in the file.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    /// Raw ASCII text of the record at `index`.
    pub fn record(&self, index: usize) -> Option<&str> {
        self.records.get(index).map(|r| r.raw.as_str())
    }

    fn spans(&self) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut base: u64 = 0;
        for (i, record) in self.records.iter().enumerate() {
            match record.rtype {
                RecordType::ExtendedSegmentAddr => {
                    let seg = u16::from_be_bytes([record.data()[0], record.data()[1]]);
                    base = (seg as u64) * 16;
                }
                RecordType::ExtendedLinearAddr => {
                    let hi = u16::from_be_bytes([record.data()[0], record.data()[1]]);
                    base = (hi as u64) << 16;
                }
                RecordType::Data => {
                    let start = base + record.address as u64;
                    let end = start + record.length as u64;
                    spans.push(Span {
                        record_index: i,
                        start,
                        end,
                    });
                }
                _ => {}
            }
        }
        spans
    }

    pub fn read_at(&self, pos: u64, size: usize) -> Result<Vec<u8>, HexError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let spans = self.spans();
        let mut it = spans.iter();
        let first = it
            .by_ref()
            .find(|s| s.start <= pos && pos < s.end)
            .ok_or_else(|| HexError::AccessOutOfBounds(format!("no data covers address {pos:#x}")))?;

        let mut out = Vec::with_capacity(size);
        let record = &self.records[first.record_index];
        let data = record.data();
        let offset_in_record = (pos - first.start) as usize;
        out.extend_from_slice(&data[offset_in_record..]);

        let mut next_index = first.record_index;
        while out.len() < size {
            next_index += 1;
            let record = self.records.get(next_index).ok_or_else(|| {
                HexError::AccessOutOfBounds("ran out of records before satisfying the read".to_string())
            })?;
            if record.rtype != RecordType::Data {
                return Err(HexError::AccessOutOfBounds(
                    "non-contiguous data: hit a non-data record".to_string(),
                ));
            }
            out.extend_from_slice(&record.data());
        }
        out.truncate(size);
        Ok(out)
    }

    pub fn write_at(&mut self, pos: u64, data: &[u8]) -> Result<(), HexError> {
        if data.is_empty() {
            return Ok(());
        }
        let spans = self.spans();
        let first = spans
            .iter()
            .find(|s| s.start <= pos && pos < s.end)
            .ok_or_else(|| HexError::AccessOutOfBounds(format!("no data covers address {pos:#x}")))?;

        let mut record_index = first.record_index;
        let mut offset_in_record = (pos - first.start) as usize;
        let mut remaining = data;

        loop {
            let record = &mut self.records[record_index];
            let available = record.length as usize - offset_in_record;
            let take = remaining.len().min(available);
            record.patch(offset_in_record * 2, &remaining[..take]);
            remaining = &remaining[take..];
            if remaining.is_empty() {
                return Ok(());
            }
            record_index += 1;
            offset_in_record = 0;
            match self.records.get(record_index) {
                Some(r) if r.rtype == RecordType::Data => continue,
                _ => {
                    return Err(HexError::AccessOutOfBounds(
                        "non-contiguous data: hit a non-data record".to_string(),
                    ))
                }
            }
        }
    }

    /// The file serialised as bytes (spec.md §4.4 `as_bytes`): the
    /// `Data` records' payloads concatenated in file order.
    pub fn data_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for record in &self.records {
            if record.rtype == RecordType::Data {
                out.extend(record.data());
            }
        }
        out
    }

    pub fn save(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.raw);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = ":10C20000E0A5E6F6FDFFE0AEE00FE6FCFDFFE6FD93\n:00000001FF\n";

    #[test]
    fn parses_file_and_counts_records() {
        let hex = HexFile::parse(SAMPLE).unwrap();
        assert_eq!(hex.size(), 2);
    }

    #[test]
    fn rejects_missing_eof() {
        assert!(HexFile::parse(":10C20000E0A5E6F6FDFFE0AEE00FE6FCFDFFE6FD93\n").is_err());
    }

    #[test]
    fn reads_data_at_flat_address() {
        let hex = HexFile::parse(SAMPLE).unwrap();
        let bytes = hex.read_at(0xC200, 2).unwrap();
        assert_eq!(bytes, vec![0xE0, 0xA5]);
    }

    #[test]
    fn write_at_roundtrips_through_reparse() {
        let mut hex = HexFile::parse(SAMPLE).unwrap();
        hex.write_at(0xC200, &[0x11, 0x22]).unwrap();
        let saved = hex.save();
        let reparsed = HexFile::parse(&saved).unwrap();
        assert_eq!(reparsed.read_at(0xC200, 2).unwrap(), vec![0x11, 0x22]);
    }

    #[test]
    fn read_out_of_bounds_errors() {
        let hex = HexFile::parse(SAMPLE).unwrap();
        assert!(hex.read_at(0, 4).is_err());
    }

    #[test]
    fn zero_size_read_is_noop() {
        let hex = HexFile::parse(SAMPLE).unwrap();
        assert_eq!(hex.read_at(0xC200, 0).unwrap(), Vec::<u8>::new());
    }
}
