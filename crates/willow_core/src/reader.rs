use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::byte_order::ByteOrder;

pub struct WillowReader<R> {
    inner: R,
    order: ByteOrder,
}

impl<R: Read + Seek> WillowReader<R> {
    pub fn new(inner: R, order: ByteOrder) -> Self {
        Self { inner, order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.inner.read_u8()
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        match self.order {
            ByteOrder::Little => self.inner.read_i16::<LittleEndian>(),
            ByteOrder::Big => self.inner.read_i16::<BigEndian>(),
        }
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        match self.order {
            ByteOrder::Little => self.inner.read_u16::<LittleEndian>(),
            ByteOrder::Big => self.inner.read_u16::<BigEndian>(),
        }
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        match self.order {
            ByteOrder::Little => self.inner.read_i32::<LittleEndian>(),
            ByteOrder::Big => self.inner.read_i32::<BigEndian>(),
        }
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        match self.order {
            ByteOrder::Little => self.inner.read_u32::<LittleEndian>(),
            ByteOrder::Big => self.inner.read_u32::<BigEndian>(),
        }
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        match self.order {
            ByteOrder::Little => self.inner.read_u64::<LittleEndian>(),
            ByteOrder::Big => self.inner.read_u64::<BigEndian>(),
        }
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        match self.order {
            ByteOrder::Little => self.inner.read_f32::<LittleEndian>(),
            ByteOrder::Big => self.inner.read_f32::<BigEndian>(),
        }
    }

    pub fn read_i32_array<const N: usize>(&mut self) -> io::Result<[i32; N]> {
        let mut result = [0i32; N];
        for item in &mut result {
            *item = self.read_i32()?;
        }
        Ok(result)
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        if n as u64 > self.remaining()? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("need {n} bytes, stream ends first"),
            ));
        }
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed marker and fail with `InvalidData` if it differs.
    pub fn expect_magic(&mut self, expected: &[u8], what: &str) -> io::Result<()> {
        let found = self.read_bytes(expected.len())?;
        if found != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{what} mismatch: expected {:?}, found {:?}",
                    String::from_utf8_lossy(expected),
                    String::from_utf8_lossy(&found)
                ),
            ));
        }
        Ok(())
    }

    /// Read a length-prefixed string.
    ///
    /// A positive length counts single-byte characters, a negative length
    /// counts UTF-16 units; both include a trailing NUL. Zero is the empty
    /// string.
    pub fn read_string(&mut self) -> io::Result<String> {
        let len = self.read_i32()?;
        if len == 0 {
            return Ok(String::new());
        }

        if len > 0 {
            let bytes = self.read_bytes(len as usize)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            return Ok(bytes[..end].iter().map(|&b| char::from(b)).collect());
        }

        let units = len.unsigned_abs() as usize;
        if units as u64 * 2 > self.remaining()? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("UTF-16 string of {units} units runs past end of stream"),
            ));
        }
        let mut wide = Vec::with_capacity(units);
        for _ in 0..units {
            wide.push(self.read_u16()?);
        }
        let end = wide.iter().position(|&u| u == 0).unwrap_or(wide.len());
        String::from_utf16(&wide[..end]).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Read an `i32` element count and reject it when `count * min_width`
    /// bytes cannot possibly remain.
    pub fn read_count(&mut self, min_width: u64, what: &str) -> io::Result<usize> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("negative {what} count {count}"),
            ));
        }
        let remaining = self.remaining()?;
        if count as u64 * min_width > remaining {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{what} count {count} needs at least {} bytes, only {remaining} remain",
                    count as u64 * min_width
                ),
            ));
        }
        Ok(count as usize)
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn len(&mut self) -> io::Result<u64> {
        let cur = self.position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(cur))?;
        Ok(end)
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn remaining(&mut self) -> io::Result<u64> {
        let cur = self.position()?;
        Ok(self.len()?.saturating_sub(cur))
    }
}
