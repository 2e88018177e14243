//! Result file assembly: a reserved offset header, eight sections in fixed
//! order, then the header rewritten with the final offsets.

pub mod messages;
pub mod sections;

use std::io::{self, Seek, Write};

use log::debug;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::layout::{RESULT_SIGNATURE, RESULT_SLOT_COUNT, SectionId};
use crate::writer::LittleEndianWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Empty,
    HeaderReserved,
    Finalized,
}

pub struct ResultWriter<W> {
    out: LittleEndianWriter<W>,
    state: AssemblerState,
    offsets: [u32; RESULT_SLOT_COUNT],
    next_slot: usize,
}

impl<W: Write + Seek> ResultWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: LittleEndianWriter::new(inner),
            state: AssemblerState::Empty,
            offsets: [0; RESULT_SLOT_COUNT],
            next_slot: 0,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Write the placeholder header.
    pub fn begin(&mut self) -> Result<(), CoreError> {
        if self.state != AssemblerState::Empty {
            return Err(invalid_state(format!(
                "begin called in state {:?}",
                self.state
            )));
        }
        self.write_header().map_err(|e| CoreError::io("result header", e))?;
        self.state = AssemblerState::HeaderReserved;
        Ok(())
    }

    /// The section expected next, if any remain.
    pub fn next_section(&self) -> Option<SectionId> {
        SectionId::BODY_ORDER.get(self.next_slot).copied()
    }

    /// 1-based file position the next section will start at.
    pub fn next_offset(&mut self) -> Result<u32, CoreError> {
        let pos = self
            .out
            .position()
            .map_err(|e| CoreError::io("result file", e))?;
        Ok(pos as u32 + 1)
    }

    pub fn write_section(&mut self, id: SectionId, bytes: &[u8]) -> Result<(), CoreError> {
        if self.state != AssemblerState::HeaderReserved {
            return Err(invalid_state(format!(
                "section {} written in state {:?}",
                id.as_str(),
                self.state
            )));
        }
        let expected = self.next_section();
        if expected != Some(id) {
            return Err(invalid_state(format!(
                "section {} written out of order, expected {}",
                id.as_str(),
                expected.map_or("none", |s| s.as_str())
            )));
        }

        let offset = self.next_offset()?;
        self.out
            .write_bytes(bytes)
            .map_err(|e| CoreError::io(format!("section {}", id.as_str()), e))?;
        self.offsets[self.next_slot] = offset;
        self.next_slot += 1;
        debug!(
            "section {} at offset {} ({} bytes)",
            id.as_str(),
            offset,
            bytes.len()
        );
        Ok(())
    }

    /// Rewrite the header with the recorded offsets. All eight sections must
    /// have been written.
    pub fn finish(&mut self) -> Result<(), CoreError> {
        if self.state != AssemblerState::HeaderReserved {
            return Err(invalid_state(format!(
                "finish called in state {:?}",
                self.state
            )));
        }
        if let Some(missing) = self.next_section() {
            return Err(invalid_state(format!(
                "finish called before section {} was written",
                missing.as_str()
            )));
        }

        self.rewrite_header()
            .map_err(|e| CoreError::io("result header", e))?;
        self.state = AssemblerState::Finalized;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, CoreError> {
        if self.state != AssemblerState::Finalized {
            return Err(invalid_state(format!(
                "result file released in state {:?}",
                self.state
            )));
        }
        Ok(self.out.into_inner())
    }

    fn write_header(&mut self) -> io::Result<()> {
        let body_slots = SectionId::BODY_ORDER.len();
        for &offset in &self.offsets[..body_slots] {
            self.out.write_u32(offset)?;
        }
        self.out.write_bytes(RESULT_SIGNATURE)?;
        for &offset in &self.offsets[body_slots..] {
            self.out.write_u32(offset)?;
        }
        Ok(())
    }

    fn rewrite_header(&mut self) -> io::Result<()> {
        let end = self.out.position()?;
        self.out.seek_to(0)?;
        self.write_header()?;
        self.out.seek_to(end)?;
        self.out.flush()
    }
}

fn invalid_state(message: String) -> CoreError {
    CoreError::new(CoreErrorCode::InvalidState, message)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{AssemblerState, ResultWriter};
    use crate::core_api::CoreErrorCode;
    use crate::layout::{RESULT_HEADER_LEN, SectionId, read_result_layout};

    fn assemble(lengths: [usize; 8]) -> Vec<u8> {
        let mut writer = ResultWriter::new(Cursor::new(Vec::new()));
        writer.begin().expect("begin");
        for (id, len) in SectionId::BODY_ORDER.iter().zip(lengths) {
            writer.write_section(*id, &vec![0xAB; len]).expect("section");
        }
        writer.finish().expect("finish");
        writer.into_inner().expect("finalized").into_inner()
    }

    #[test]
    fn offsets_are_one_based_running_totals() {
        let lengths = [3, 0, 7, 2, 11, 5, 1, 4];
        let bytes = assemble(lengths);
        assert_eq!(bytes.len(), RESULT_HEADER_LEN + lengths.iter().sum::<usize>());

        let mut expected = RESULT_HEADER_LEN as u32 + 1;
        for (slot, len) in lengths.iter().enumerate() {
            let at = slot * 4;
            let offset = u32::from_le_bytes(bytes[at..at + 4].try_into().expect("4 bytes"));
            assert_eq!(offset, expected, "slot {slot}");
            expected += *len as u32;
        }
        assert_eq!(&bytes[32..40], b"VER3.501");
        assert_eq!(&bytes[40..48], &[0; 8]);
    }

    #[test]
    fn layout_reader_recovers_section_ranges() {
        let bytes = assemble([2, 4, 6, 8, 10, 12, 14, 16]);
        let layout = read_result_layout(Cursor::new(&bytes)).expect("layout");
        let planets = layout.section(SectionId::Planets).expect("planets");
        assert_eq!(planets.range.start, RESULT_HEADER_LEN + 6);
        assert_eq!(planets.range.len(), 6);
        let combat = layout.section(SectionId::Combat).expect("vcr");
        assert_eq!(combat.range.end, bytes.len());
    }

    #[test]
    fn rejects_out_of_order_sections() {
        let mut writer = ResultWriter::new(Cursor::new(Vec::new()));
        writer.begin().expect("begin");
        let err = writer
            .write_section(SectionId::Planets, &[])
            .expect_err("planets before ships");
        assert_eq!(err.code, CoreErrorCode::InvalidState);
    }

    #[test]
    fn rejects_writes_before_begin_and_after_finish() {
        let mut writer = ResultWriter::new(Cursor::new(Vec::new()));
        let err = writer
            .write_section(SectionId::Ships, &[])
            .expect_err("no header yet");
        assert_eq!(err.code, CoreErrorCode::InvalidState);

        writer.begin().expect("begin");
        for id in SectionId::BODY_ORDER {
            writer.write_section(id, &[1]).expect("section");
        }
        writer.finish().expect("finish");
        assert_eq!(writer.state(), AssemblerState::Finalized);
        let err = writer
            .write_section(SectionId::Combat, &[])
            .expect_err("finalized");
        assert_eq!(err.code, CoreErrorCode::InvalidState);
        assert!(writer.finish().is_err());
    }

    #[test]
    fn finish_requires_every_section() {
        let mut writer = ResultWriter::new(Cursor::new(Vec::new()));
        writer.begin().expect("begin");
        writer.write_section(SectionId::Ships, &[0, 0]).expect("ships");
        let err = writer.finish().expect_err("incomplete");
        assert_eq!(err.code, CoreErrorCode::InvalidState);
    }
}
