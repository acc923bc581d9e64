use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::byte_order::ByteOrder;

/// Growable output buffer mirroring [`crate::reader::WillowReader`].
pub struct WillowWriter {
    out: Vec<u8>,
    order: ByteOrder,
}

macro_rules! write_ordered {
    ($name:ident, $ty:ty, $width:expr) => {
        pub fn $name(&mut self, value: $ty) {
            let mut buf = [0u8; $width];
            match self.order {
                ByteOrder::Little => LittleEndian::$name(&mut buf, value),
                ByteOrder::Big => BigEndian::$name(&mut buf, value),
            }
            self.out.extend_from_slice(&buf);
        }
    };
}

impl WillowWriter {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            out: Vec::new(),
            order,
        }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn write_u8(&mut self, value: u8) {
        self.out.push(value);
    }

    write_ordered!(write_i16, i16, 2);
    write_ordered!(write_u16, u16, 2);
    write_ordered!(write_i32, i32, 4);
    write_ordered!(write_u32, u32, 4);
    write_ordered!(write_f32, f32, 4);

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    pub fn write_i32_slice(&mut self, values: &[i32]) {
        for &v in values {
            self.write_i32(v);
        }
    }

    pub fn write_count(&mut self, count: usize) {
        self.write_i32(count as i32);
    }

    /// Write a length-prefixed, NUL-terminated string. Text outside Latin-1
    /// is stored as UTF-16 with a negative length.
    ///
    /// Readers stop at the first NUL, so anything after an embedded `'\0'`
    /// is written but does not come back.
    pub fn write_string(&mut self, value: &str) {
        if value.is_empty() {
            self.write_i32(0);
            return;
        }

        if value.chars().all(|c| (c as u32) <= 0xFF) {
            let count = value.chars().count() + 1;
            self.write_i32(count as i32);
            for c in value.chars() {
                self.out.push(c as u32 as u8);
            }
            self.out.push(0);
            return;
        }

        let wide: Vec<u16> = value.encode_utf16().chain(std::iter::once(0)).collect();
        self.write_i32(-(wide.len() as i32));
        for unit in wide {
            self.write_u16(unit);
        }
    }

    pub fn position(&self) -> usize {
        self.out.len()
    }

    /// Overwrite a previously reserved `i32` slot, used for length prefixes.
    pub fn patch_i32(&mut self, at: usize, value: i32) {
        let slot = &mut self.out[at..at + 4];
        match self.order {
            ByteOrder::Little => LittleEndian::write_i32(slot, value),
            ByteOrder::Big => BigEndian::write_i32(slot, value),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}
