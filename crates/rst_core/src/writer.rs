use std::io::{self, Seek, SeekFrom, Write};

/// Little-endian writer for the legacy record layouts.
///
/// Word and dword helpers take `i64` and keep the low 16/32 bits, so `-1`
/// lands as `0xFFFF`/`0xFFFF_FFFF` the way the consumer expects.
pub struct LittleEndianWriter<W> {
    inner: W,
}

impl<W: Write> LittleEndianWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_u16(&mut self, v: u16) -> io::Result<()> {
        self.inner.write_all(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> io::Result<()> {
        self.inner.write_all(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> io::Result<()> {
        self.inner.write_all(&v.to_le_bytes())
    }

    pub fn write_word(&mut self, v: i64) -> io::Result<()> {
        self.write_u16(v as u16)
    }

    pub fn write_dword(&mut self, v: i64) -> io::Result<()> {
        self.write_u32(v as u32)
    }

    pub fn write_words(&mut self, values: &[i64]) -> io::Result<()> {
        for &v in values {
            self.write_word(v)?;
        }
        Ok(())
    }

    /// Write `text` into exactly `width` bytes, truncating or padding with `pad`.
    pub fn write_fixed_text(&mut self, text: &[u8], width: usize, pad: u8) -> io::Result<()> {
        let used = text.len().min(width);
        self.inner.write_all(&text[..used])?;
        self.write_fill(pad, width - used)
    }

    pub fn write_fill(&mut self, byte: u8, n: usize) -> io::Result<()> {
        self.inner.write_all(&vec![byte; n])
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> LittleEndianWriter<W> {
    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn seek_to_end(&mut self) -> io::Result<u64> {
        self.inner.seek(SeekFrom::End(0))
    }
}

/// Encode a section into a fresh buffer.
pub fn encode_to_vec(
    f: impl FnOnce(&mut LittleEndianWriter<Vec<u8>>) -> io::Result<()>,
) -> io::Result<Vec<u8>> {
    let mut w = LittleEndianWriter::new(Vec::new());
    f(&mut w)?;
    Ok(w.into_inner())
}
