//! Wire protocol for drained experiment buffers
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────────────────────────┐
//! │ count: i32 │ record × count                                           │
//! └────────────┴──────────────────────────────────────────────────────────┘
//!
//! record:
//! ┌──────────┬───────────────┬──────────┬────────────┬──────────┬─────────┐
//! │ len: u16 │ class_sig     │ line:i32 │ speedup:f32│ dur: i64 │ hits:i64│
//! │          │ (len bytes,   │          │ (IEEE 754) │ (ns)     │         │
//! │          │  UTF-8)       │          │            │          │         │
//! └──────────┴───────────────┴──────────┴────────────┴──────────┴─────────┘
//! ```
//!
//! An empty drain encodes as a bare zero count.

use crate::domain::WireError;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use cozctl_common::{ExperimentRecord, COUNT_PREFIX_LEN, MAX_CLASS_SIG_LEN, RECORD_FIXED_LEN};
use std::io::{Cursor, Read, Write};

/// Encode `records` in order.
///
/// # Errors
/// Returns [`WireError::ClassSigTooLong`] or [`WireError::TooManyRecords`]
/// if a record or the batch exceeds the format's limits.
pub fn encode(records: &[ExperimentRecord]) -> Result<Vec<u8>, WireError> {
    let count = i32::try_from(records.len()).map_err(|_| WireError::TooManyRecords(records.len()))?;
    let size = COUNT_PREFIX_LEN + records.iter().map(ExperimentRecord::encoded_len).sum::<usize>();
    let mut out = Vec::with_capacity(size);

    out.write_i32::<BigEndian>(count)?;
    for record in records {
        write_record(&mut out, record)?;
    }
    Ok(out)
}

fn write_record<W: Write>(out: &mut W, record: &ExperimentRecord) -> Result<(), WireError> {
    let sig = record.class_sig.as_bytes();
    let len = u16::try_from(sig.len()).map_err(|_| WireError::ClassSigTooLong(sig.len()))?;
    debug_assert!(sig.len() <= MAX_CLASS_SIG_LEN);

    out.write_u16::<BigEndian>(len)?;
    out.write_all(sig)?;
    out.write_i32::<BigEndian>(record.line_no)?;
    out.write_f32::<BigEndian>(record.speedup)?;
    out.write_i64::<BigEndian>(record.duration)?;
    out.write_i64::<BigEndian>(record.points_hit)?;
    Ok(())
}

/// Decode a buffer produced by [`encode`].
///
/// # Errors
/// Fails on truncated input, a negative count, invalid UTF-8 in a class
/// signature, or bytes left over after the last record.
pub fn decode(bytes: &[u8]) -> Result<Vec<ExperimentRecord>, WireError> {
    let mut cursor = Cursor::new(bytes);

    let count = read_or_truncated(&mut cursor, COUNT_PREFIX_LEN, |c| c.read_i32::<BigEndian>())?;
    let count = usize::try_from(count).map_err(|_| WireError::NegativeCount(count))?;

    // Cap the preallocation by what the input could possibly hold
    let max_possible = bytes.len() / (2 + RECORD_FIXED_LEN);
    let mut records = Vec::with_capacity(count.min(max_possible));
    for _ in 0..count {
        records.push(read_record(&mut cursor)?);
    }

    let consumed = usize::try_from(cursor.position()).unwrap_or(bytes.len());
    if consumed < bytes.len() {
        return Err(WireError::TrailingBytes(bytes.len() - consumed));
    }
    Ok(records)
}

fn read_record(cursor: &mut Cursor<&[u8]>) -> Result<ExperimentRecord, WireError> {
    let len = read_or_truncated(cursor, 2, |c| c.read_u16::<BigEndian>())?;

    let mut sig = vec![0u8; usize::from(len)];
    read_or_truncated(cursor, sig.len(), |c| c.read_exact(&mut sig))?;
    let class_sig = String::from_utf8(sig)?;

    read_or_truncated(cursor, RECORD_FIXED_LEN, |c| {
        let line_no = c.read_i32::<BigEndian>()?;
        let speedup = c.read_f32::<BigEndian>()?;
        let duration = c.read_i64::<BigEndian>()?;
        let points_hit = c.read_i64::<BigEndian>()?;
        Ok(ExperimentRecord { class_sig, line_no, speedup, duration, points_hit })
    })
}

/// Run `read` after checking that `needed` bytes remain, so short input
/// reports its offset instead of a bare EOF.
fn read_or_truncated<T>(
    cursor: &mut Cursor<&[u8]>,
    needed: usize,
    read: impl FnOnce(&mut Cursor<&[u8]>) -> std::io::Result<T>,
) -> Result<T, WireError> {
    let offset = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    let remaining = cursor.get_ref().len().saturating_sub(offset);
    if remaining < needed {
        return Err(WireError::Truncated { offset, needed: needed - remaining });
    }
    Ok(read(cursor)?)
}
