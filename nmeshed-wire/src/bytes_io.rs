// Small little-endian cursor helpers, in the spirit of submerge-coldb's
// ioutil Reader/Writer split, but scaled down to what the wire frame layouts
// actually need: fixed-width integers and length-prefixed
// byte/utf8 runs.

use nmeshed_base::{codec_err, Error};

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(codec_err("unexpected end of buffer"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_array16(&mut self) -> Result<[u8; 16], Error> {
        Ok(self.take(16)?.try_into().unwrap())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        Ok(self.take(n)?.to_vec())
    }

    pub fn read_u32_prefixed_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    pub fn read_u32_prefixed_string(&mut self) -> Result<String, Error> {
        let bytes = self.read_u32_prefixed_bytes()?;
        String::from_utf8(bytes).map_err(|e| codec_err(format!("invalid utf8: {e}")))
    }

    pub fn read_u8_prefixed_string(&mut self) -> Result<String, Error> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| codec_err(format!("invalid utf8: {e}")))
    }
}

#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter::default()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_array16(&mut self, v: &[u8; 16]) {
        self.buf.extend_from_slice(v);
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn write_u32_prefixed_bytes(&mut self, v: &[u8]) {
        self.write_u32(v.len() as u32);
        self.write_bytes(v);
    }

    pub fn write_u32_prefixed_string(&mut self, v: &str) {
        self.write_u32_prefixed_bytes(v.as_bytes());
    }

    pub fn write_u8_prefixed_string(&mut self, v: &str) -> Result<(), Error> {
        if v.len() > u8::MAX as usize {
            return Err(codec_err("string too long for u8-prefixed field"));
        }
        self.write_u8(v.len() as u8);
        self.write_bytes(v.as_bytes());
        Ok(())
    }
}
