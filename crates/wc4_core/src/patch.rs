//! In-place mutation of a save file at offsets recorded by the decoder.
//!
//! Every function opens the file, validates its inputs before the first
//! write, and closes the file again. Nothing here locks the file: running two
//! editors against the same path at once is unsupported.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{CoreError, CoreErrorCode, Result};
use crate::layout::ByteRange;
use crate::registry::{OffsetKey, OffsetRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldWidth {
    Byte,
    Word,
    DWord,
}

impl FieldWidth {
    pub fn from_bytes(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Byte),
            2 => Some(Self::Word),
            4 => Some(Self::DWord),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::DWord => 4,
        }
    }

    pub fn max_value(self) -> u64 {
        (1u64 << (8 * self.bytes())) - 1
    }

    fn encode(self, value: u64) -> Result<Vec<u8>> {
        if value > self.max_value() {
            return Err(CoreError::new(
                CoreErrorCode::ValueOverflow,
                format!(
                    "value {value} does not fit in {} byte(s), max {}",
                    self.bytes(),
                    self.max_value()
                ),
            ));
        }
        Ok(value.to_le_bytes()[..self.bytes()].to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub range: ByteRange,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShiftReport {
    /// The region as it was before the rewrite.
    pub replaced: ByteRange,
    /// Where the replacement bytes now live.
    pub written: ByteRange,
    /// Bytes relocated from after the old region.
    pub moved: usize,
    /// Signed distance every relocated byte moved by.
    pub delta: i64,
    /// Old bytes left past the new end of content when the file shrank.
    pub stale_tail: usize,
}

/// Overwrite `width` bytes at `offset` with `value`, little-endian.
pub fn write_fixed_width(
    path: &Path,
    offset: usize,
    value: u64,
    width: FieldWidth,
) -> Result<PatchReport> {
    let bytes = width.encode(value)?;
    let mut file = open_rw(path)?;
    let file_len = file_len(&file, path)?;
    let range = ByteRange {
        start: offset,
        end: offset.saturating_add(bytes.len()),
    };
    if range.end > file_len {
        return Err(out_of_range(range, file_len));
    }

    seek(&mut file, offset, path)?;
    file.write_all(&bytes)
        .map_err(|e| CoreError::io(format!("failed to write {}", path.display()), e))?;

    info!(
        path = %path.display(),
        offset,
        width = bytes.len(),
        value,
        "patched fixed-width field"
    );
    Ok(PatchReport { range, value })
}

pub fn write_fixed_width_at_key(
    path: &Path,
    registry: &OffsetRegistry,
    key: OffsetKey,
    value: u64,
    width: FieldWidth,
) -> Result<PatchReport> {
    let offset = registry.lookup(key)?;
    write_fixed_width(path, offset, value, width)
}

/// Replace the region between two recorded offsets with `new_bytes`,
/// shifting everything after it so the file stays contiguous.
///
/// The file is never truncated: when the new content is shorter, the last
/// `stale_tail` bytes keep their old values. Readers size every block from
/// header counts, so those bytes are never reached.
///
/// All offsets recorded after `end_key` are stale once this returns.
pub fn replace_region(
    path: &Path,
    registry: &OffsetRegistry,
    start_key: OffsetKey,
    end_key: OffsetKey,
    new_bytes: &[u8],
) -> Result<ShiftReport> {
    let start = registry.lookup(start_key)?;
    let end = registry.lookup(end_key)?;
    if end < start {
        return Err(CoreError::invariant(format!(
            "region {start_key}..{end_key} is inverted: {start} > {end}"
        )));
    }
    let replaced = ByteRange { start, end };

    let mut file = open_rw(path)?;
    let file_len = file_len(&file, path)?;
    if end > file_len {
        return Err(out_of_range(replaced, file_len));
    }

    let mut remainder = Vec::with_capacity(file_len - end);
    seek(&mut file, end, path)?;
    file.read_to_end(&mut remainder)
        .map_err(|e| CoreError::io(format!("failed to read {}", path.display()), e))?;

    seek(&mut file, start, path)?;
    file.write_all(new_bytes)
        .and_then(|()| file.write_all(&remainder))
        .map_err(|e| CoreError::io(format!("failed to write {}", path.display()), e))?;

    let written = ByteRange {
        start,
        end: start + new_bytes.len(),
    };
    let content_end = written.end + remainder.len();
    let report = ShiftReport {
        replaced,
        written,
        moved: remainder.len(),
        delta: new_bytes.len() as i64 - replaced.len() as i64,
        stale_tail: file_len.saturating_sub(content_end),
    };
    info!(
        path = %path.display(),
        start,
        old_end = end,
        new_end = written.end,
        moved = report.moved,
        delta = report.delta,
        "rewrote region"
    );
    Ok(report)
}

fn open_rw(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| CoreError::io(format!("failed to open {}", path.display()), e))
}

fn file_len(file: &File, path: &Path) -> Result<usize> {
    let meta = file
        .metadata()
        .map_err(|e| CoreError::io(format!("failed to stat {}", path.display()), e))?;
    Ok(meta.len() as usize)
}

fn seek(file: &mut File, offset: usize, path: &Path) -> Result<()> {
    file.seek(SeekFrom::Start(offset as u64))
        .map(|_| ())
        .map_err(|e| CoreError::io(format!("failed to seek {}", path.display()), e))
}

fn out_of_range(range: ByteRange, file_len: usize) -> CoreError {
    CoreError::new(
        CoreErrorCode::OffsetOutOfRange,
        format!(
            "bytes {}..{} lie outside a {file_len}-byte file",
            range.start, range.end
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::FieldWidth;
    use crate::error::CoreErrorCode;

    #[test]
    fn width_limits_follow_byte_count() {
        assert_eq!(FieldWidth::Byte.max_value(), 255);
        assert_eq!(FieldWidth::Word.max_value(), 65_535);
        assert_eq!(FieldWidth::DWord.max_value(), u32::MAX as u64);
        assert_eq!(FieldWidth::from_bytes(3), None);
    }

    #[test]
    fn encode_is_little_endian_and_rejects_overflow() {
        assert_eq!(FieldWidth::Word.encode(9999).unwrap(), vec![0x0f, 0x27]);
        assert_eq!(
            FieldWidth::Word.encode(70_000).unwrap_err().code,
            CoreErrorCode::ValueOverflow
        );
    }
}
