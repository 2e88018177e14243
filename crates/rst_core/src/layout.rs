use std::io::{self, Read, Seek};

use crate::reader::LittleEndianReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Sections of a result file, in the order they must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    Header,
    Ships,
    Targets,
    Planets,
    Bases,
    Messages,
    ShipXy,
    Generation,
    Combat,
}

impl SectionId {
    pub const BODY_ORDER: [SectionId; 8] = [
        SectionId::Ships,
        SectionId::Targets,
        SectionId::Planets,
        SectionId::Bases,
        SectionId::Messages,
        SectionId::ShipXy,
        SectionId::Generation,
        SectionId::Combat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Ships => "ships",
            Self::Targets => "targets",
            Self::Planets => "planets",
            Self::Bases => "bases",
            Self::Messages => "messages",
            Self::ShipXy => "shipxy",
            Self::Generation => "gen",
            Self::Combat => "vcr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLayout {
    pub id: SectionId,
    pub range: ByteRange,
}

#[derive(Debug, Clone)]
pub struct FileLayout {
    pub file_len: usize,
    pub sections: Vec<SectionLayout>,
}

impl FileLayout {
    pub fn section(&self, id: SectionId) -> Option<&SectionLayout> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn validate(&self) -> io::Result<()> {
        let Some(first) = self.sections.first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "file layout must contain at least one section",
            ));
        };

        if first.range.start != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "layout does not start at byte 0",
            ));
        }

        let mut expected = 0usize;
        for section in &self.sections {
            if section.range.start != expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "layout gap/overlap around section {:?}: expected start {}, got {}",
                        section.id, expected, section.range.start
                    ),
                ));
            }
            if section.range.end < section.range.start {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "invalid section range {:?}: {}..{}",
                        section.id, section.range.start, section.range.end
                    ),
                ));
            }
            expected = section.range.end;
        }

        if expected != self.file_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "layout does not cover file: ended at {}, file length {}",
                    expected, self.file_len
                ),
            ));
        }

        Ok(())
    }
}

pub const RESULT_SIGNATURE: &[u8; 8] = b"VER3.501";
pub const RESULT_SLOT_COUNT: usize = 10;
pub const RESULT_HEADER_LEN: usize = RESULT_SLOT_COUNT * 4 + RESULT_SIGNATURE.len();

/// Recover section ranges from the offset header of a result file.
pub fn read_result_layout<R: Read + Seek>(reader: R) -> io::Result<FileLayout> {
    let mut r = LittleEndianReader::new(reader);
    let file_len = r.len()? as usize;
    r.seek_to(0)?;
    let offsets = r.read_u32_array::<8>()?;
    let signature = r.read_bytes(RESULT_SIGNATURE.len())?;
    if signature != RESULT_SIGNATURE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "missing result signature, found {:?}",
                String::from_utf8_lossy(&signature)
            ),
        ));
    }
    let _trailer = r.read_u32_array::<2>()?;

    let mut sections = vec![SectionLayout {
        id: SectionId::Header,
        range: ByteRange {
            start: 0,
            end: RESULT_HEADER_LEN,
        },
    }];
    for (idx, id) in SectionId::BODY_ORDER.iter().enumerate() {
        let offset = offsets[idx] as usize;
        if offset == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("section {} has no offset", id.as_str()),
            ));
        }
        let end = offsets
            .get(idx + 1)
            .map_or(file_len, |&next| (next as usize).saturating_sub(1));
        sections.push(SectionLayout {
            id: *id,
            range: ByteRange {
                start: offset - 1,
                end,
            },
        });
    }

    let layout = FileLayout { file_len, sections };
    layout.validate()?;
    Ok(layout)
}
