//! # Composite accumulator codec
//!
//! Wire format:
//!
//! ```text
//! +----------------+-----------+-----------+-----+-------------+
//! | count (varint) | element 0 | element 1 | ... | element N-1 |
//! +----------------+-----------+-----------+-----+-------------+
//! ```
//!
//! The count is an unsigned LEB128 varint. Each element is written by the
//! codec at the same position in the codec list, with no tag or length, so
//! encoder and decoder must be built from the same ordered aggregate list.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::accumulator::CompositeAccumulator;
use crate::error::{Error, Result};
use crate::function::AccumulatorCodec;

/// Longest LEB128 encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

/// Positional codec for [`CompositeAccumulator`]s.
#[derive(Clone)]
pub struct CompositeAccumulatorCodec {
    element_codecs: Vec<Arc<dyn AccumulatorCodec>>,
}

impl CompositeAccumulatorCodec {
    pub fn new(element_codecs: Vec<Arc<dyn AccumulatorCodec>>) -> Self {
        Self { element_codecs }
    }

    /// Number of elements this codec expects.
    pub fn len(&self) -> usize {
        self.element_codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_codecs.is_empty()
    }

    pub fn encode<W: Write>(&self, acc: &CompositeAccumulator, writer: &mut W) -> Result<()> {
        if acc.len() != self.element_codecs.len() {
            return Err(Error::Codec(format!(
                "cannot encode {} elements with {} element codecs",
                acc.len(),
                self.element_codecs.len()
            )));
        }
        write_varint(writer, acc.len() as u64)?;
        for (codec, element) in self.element_codecs.iter().zip(acc.elements()) {
            codec.encode(element, &mut *writer)?;
        }
        Ok(())
    }

    pub fn decode<R: Read>(&self, reader: &mut R) -> Result<CompositeAccumulator> {
        let count = read_varint(reader)?;
        if count != self.element_codecs.len() as u64 {
            return Err(Error::Codec(format!(
                "encoded accumulator has {count} elements, expected {}",
                self.element_codecs.len()
            )));
        }
        let mut elements = Vec::with_capacity(self.element_codecs.len());
        for codec in &self.element_codecs {
            elements.push(codec.decode(&mut *reader)?);
        }
        Ok(CompositeAccumulator::new(elements))
    }

    pub fn encode_to_vec(&self, acc: &CompositeAccumulator) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(acc, &mut buf)?;
        tracing::trace!(elements = acc.len(), bytes = buf.len(), "encoded accumulator");
        Ok(buf)
    }

    /// Decode one accumulator that must span all of `bytes`.
    pub fn decode_from_slice(&self, bytes: &[u8]) -> Result<CompositeAccumulator> {
        let mut cursor = bytes;
        let acc = self.decode(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::Codec(format!(
                "{} trailing bytes after accumulator",
                cursor.len()
            )));
        }
        tracing::trace!(elements = acc.len(), bytes = bytes.len(), "decoded accumulator");
        Ok(acc)
    }
}

impl FromIterator<Arc<dyn AccumulatorCodec>> for CompositeAccumulatorCodec {
    fn from_iter<I: IntoIterator<Item = Arc<dyn AccumulatorCodec>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for CompositeAccumulatorCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeAccumulatorCodec")
            .field("elements", &self.element_codecs.len())
            .finish()
    }
}

/// Write `value` as an unsigned LEB128 varint.
pub fn write_varint<W: Write>(writer: &mut W, mut value: u64) -> Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut len = 0;
    while value >= 0x80 {
        buf[len] = (value as u8 & 0x7f) | 0x80;
        value >>= 7;
        len += 1;
    }
    buf[len] = value as u8;
    writer
        .write_all(&buf[..=len])
        .map_err(|e| Error::Codec(format!("write varint: {e}")))
}

/// Read an unsigned LEB128 varint.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<u64> {
    let mut out = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let mut byte = [0u8; 1];
        reader
            .read_exact(&mut byte)
            .map_err(|e| Error::Codec(format!("read varint: {e}")))?;
        let byte = byte[0];
        // The tenth byte may only carry the top bit of a u64.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            break;
        }
        out |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(out);
        }
    }
    Err(Error::Codec("varint overflows u64".to_string()))
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
