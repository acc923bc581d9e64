use std::io;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionId {
    Header,
    Skills,
    Vehicles,
    AmmoPools,
    Items,
    Backpack,
    Weapons,
    Challenges,
    Locations,
    Progress,
    Quests,
    Character,
    Echoes,
    Dlc,
    Tail,
}

impl SectionId {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Header => "header",
            Self::Skills => "skills",
            Self::Vehicles => "vehicles",
            Self::AmmoPools => "ammo-pools",
            Self::Items => "items",
            Self::Backpack => "backpack",
            Self::Weapons => "weapons",
            Self::Challenges => "challenges",
            Self::Locations => "locations",
            Self::Progress => "progress",
            Self::Quests => "quests",
            Self::Character => "character",
            Self::Echoes => "echoes",
            Self::Dlc => "dlc",
            Self::Tail => "tail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLayout {
    pub id: SectionId,
    pub range: ByteRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLayout {
    pub file_len: usize,
    pub sections: Vec<SectionLayout>,
}

impl FileLayout {
    pub fn new(file_len: usize) -> Self {
        Self {
            file_len,
            sections: Vec::new(),
        }
    }

    pub fn record(&mut self, id: SectionId, start: usize, end: usize) {
        self.sections.push(SectionLayout {
            id,
            range: ByteRange { start, end },
        });
    }

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
                        "layout gap/overlap around section {}: expected start {}, got {}",
                        section.id.as_str(),
                        expected,
                        section.range.start
                    ),
                ));
            }
            if section.range.end < section.range.start {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "invalid section range {}: {}..{}",
                        section.id.as_str(),
                        section.range.start,
                        section.range.end
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

#[cfg(test)]
mod tests {
    use super::{FileLayout, SectionId};

    #[test]
    fn contiguous_layout_validates() {
        let mut layout = FileLayout::new(30);
        layout.record(SectionId::Header, 0, 10);
        layout.record(SectionId::Skills, 10, 30);
        assert!(layout.validate().is_ok());
        assert_eq!(layout.section(SectionId::Skills).map(|s| s.range.len()), Some(20));
    }

    #[test]
    fn gaps_and_short_coverage_are_rejected() {
        let mut gap = FileLayout::new(30);
        gap.record(SectionId::Header, 0, 10);
        gap.record(SectionId::Skills, 12, 30);
        assert!(gap.validate().is_err());

        let mut short = FileLayout::new(30);
        short.record(SectionId::Header, 0, 10);
        assert!(short.validate().is_err());

        assert!(FileLayout::new(0).validate().is_err());
    }
}
