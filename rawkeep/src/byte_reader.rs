//! Bounded cursor over a memory-mapped input file.
//!
//! Parsers never see a `Read` stream; they get a `ByteReader` wrapping the
//! whole mmap'd buffer and advance an internal offset. A read that runs past
//! the end of the buffer raises one `BufferOverflow` fault and then goes
//! quiet: every read after that returns a zeroed value instead of a second
//! error, so one bad chunk size doesn't produce a wall of identical
//! complaints.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::UndecodableError;

/// Which parser is driving this reader, used only to label faults.
pub type ParserName = &'static str;

pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: u64,
    parser: ParserName,
    faulted: bool,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], parser: ParserName) -> Self {
        Self {
            data,
            offset: 0,
            parser,
            faulted: false,
        }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> u64 {
        self.offset
    }

    pub fn seek(&mut self, offset: u64) {
        self.offset = offset.min(self.len());
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.offset)
    }

    pub fn has_faulted(&self) -> bool {
        self.faulted
    }

    /// Whole input buffer, for handing payload/Before/After ranges to callers
    /// that just want raw slices rather than typed reads.
    pub fn buffer(&self) -> &'a [u8] {
        self.data
    }

    fn take(&mut self, n: u64) -> Result<&'a [u8], UndecodableError> {
        let start = self.offset as usize;
        let end = start.saturating_add(n as usize);
        if end > self.data.len() {
            self.offset = self.len();
            if self.faulted {
                return Ok(&[]);
            }
            self.faulted = true;
            return Err(UndecodableError::BufferOverflow {
                parser: self.parser,
                offset: self.offset,
            });
        }
        self.offset += n;
        Ok(&self.data[start..end])
    }

    pub fn read_u8(&mut self) -> Result<u8, UndecodableError> {
        let bytes = self.take(1)?;
        Ok(bytes.first().copied().unwrap_or(0))
    }

    pub fn read_be_u16(&mut self) -> Result<u16, UndecodableError> {
        let bytes = self.take(2)?;
        Ok(if bytes.len() == 2 {
            BigEndian::read_u16(bytes)
        } else {
            0
        })
    }

    pub fn read_be_u32(&mut self) -> Result<u32, UndecodableError> {
        let bytes = self.take(4)?;
        Ok(if bytes.len() == 4 {
            BigEndian::read_u32(bytes)
        } else {
            0
        })
    }

    pub fn read_be_u64(&mut self) -> Result<u64, UndecodableError> {
        let bytes = self.take(8)?;
        Ok(if bytes.len() == 8 {
            BigEndian::read_u64(bytes)
        } else {
            0
        })
    }

    pub fn read_le_u16(&mut self) -> Result<u16, UndecodableError> {
        let bytes = self.take(2)?;
        Ok(if bytes.len() == 2 {
            LittleEndian::read_u16(bytes)
        } else {
            0
        })
    }

    pub fn read_le_u32(&mut self) -> Result<u32, UndecodableError> {
        let bytes = self.take(4)?;
        Ok(if bytes.len() == 4 {
            LittleEndian::read_u32(bytes)
        } else {
            0
        })
    }

    pub fn read_bytes(&mut self, n: u64) -> Result<&'a [u8], UndecodableError> {
        self.take(n)
    }

    /// 80-bit big-endian extended float (IEEE 754 "long double"), used only
    /// by the AIFF `COMM` chunk's sample rate field. Denormals and NaNs
    /// collapse to 0.0, matching the source's deliberate choice to treat
    /// those as "no flavor match" rather than an error.
    pub fn read_be_f80(&mut self) -> Result<f64, UndecodableError> {
        let integer1 = self.read_be_u16()?;
        let integer2 = self.read_be_u64()?;

        let sign = integer1 & 0x8000 != 0;
        let exponent = integer1 & 0x7FFF;
        let mantissa = integer2 & 0x7FFF_FFFF_FFFF_FFFF;

        if exponent == 0 || exponent == 0x7FFF {
            return Ok(0.0);
        }
        let exponent = exponent as i32 - 0x3FFF;
        let value = (mantissa as f64 / 9_223_372_036_854_775_808.0 + 1.0) * 2f64.powi(exponent);
        Ok(if sign { -value } else { value })
    }

    /// Reads an EBML-style variable-length integer at the current offset.
    pub fn read_vint(&mut self) -> Result<u64, rawkeep_container::VarintError> {
        let start = self.offset as usize;
        let (value, consumed) = rawkeep_container::decode_vint(&self.data[start..])?;
        self.offset += consumed as u64;
        Ok(value)
    }
}
