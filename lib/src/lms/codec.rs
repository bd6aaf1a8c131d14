// Big-endian byte cursor shared by every wire decoder

use crate::lms::config::{LmotsAlgorithm, LmsAlgorithm};
use crate::lms::error::{LmsError, Result};

pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Cursor over a borrowed buffer. Every short read is a `Format` error
/// naming the structure being decoded.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, pos: 0, what }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(LmsError::truncated(self.what, self.pos + len, self.buf.len()));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array::<4>()?))
    }

    pub fn lms_type(&mut self) -> Result<LmsAlgorithm> {
        let id = self.u32()?;
        LmsAlgorithm::lookup(id).ok_or_else(|| {
            LmsError::Format(format!("{}: unknown LMS type 0x{id:08x}", self.what))
        })
    }

    pub fn lmots_type(&mut self) -> Result<LmotsAlgorithm> {
        let id = self.u32()?;
        LmotsAlgorithm::lookup(id).ok_or_else(|| {
            LmsError::Format(format!("{}: unknown LM-OTS type 0x{id:08x}", self.what))
        })
    }

    /// Reject trailing bytes
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(LmsError::Format(format!(
                "{}: {} unexpected trailing bytes",
                self.what,
                self.remaining()
            )));
        }
        Ok(())
    }
}
