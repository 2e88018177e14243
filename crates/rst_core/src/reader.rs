use std::io::{self, Read, Seek, SeekFrom};

/// Little-endian counterpart of the section writer, used to inspect
/// finished files.
pub struct LittleEndianReader<R> {
    inner: R,
}

impl<R: Read + Seek> LittleEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u32_array<const N: usize>(&mut self) -> io::Result<[u32; N]> {
        let mut result = [0u32; N];
        for item in &mut result {
            *item = self.read_u32()?;
        }
        Ok(result)
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed-width, space or NUL padded 8-bit text field.
    pub fn read_fixed_text(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut bytes = self.read_bytes(n)?;
        while let Some(b' ' | 0) = bytes.last() {
            bytes.pop();
        }
        Ok(bytes)
    }

    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Current(n as i64))?;
        Ok(())
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
}
