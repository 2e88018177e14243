use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What an unpack run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Fallback location for baseline spec tables.
    pub root_dir: Option<PathBuf>,
    /// Working location: baseline tables are read from and every output
    /// file is written to this directory.
    pub output_dir: PathBuf,
    pub write_vcr_file: bool,
    pub write_result: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            root_dir: None,
            output_dir: PathBuf::from("."),
            write_vcr_file: true,
            write_result: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    SpecTable,
    HullFunctions,
    Result,
    Util,
    Combat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileReport {
    pub path: String,
    pub kind: OutputKind,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionReport {
    pub name: String,
    /// 1-based position of the first byte.
    pub offset: u32,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnpackReport {
    pub player_id: i64,
    pub race: i64,
    pub turn: i64,
    pub files: Vec<FileReport>,
    pub sections: Vec<SectionReport>,
    pub warnings: Vec<String>,
}
