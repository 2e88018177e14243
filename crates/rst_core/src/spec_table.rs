//! Fixed-count, fixed-width baseline tables that are merge-patched from the
//! document instead of being regenerated.
//!
//! A table keeps its raw record bytes. Patching writes individual cells in
//! place, so any byte the document does not describe (hull pictures, unused
//! columns) survives turn after turn.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::document::Value;
use crate::writer::LittleEndianWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Space padded 8-bit text of the given width.
    Text(usize),
    U16,
    U32,
}

impl FieldKind {
    pub fn width(&self) -> usize {
        match *self {
            Self::Text(width) => width,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

pub const fn text(name: &'static str, width: usize) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Text(width),
    }
}

pub const fn word(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::U16,
    }
}

pub const fn dword(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::U32,
    }
}

/// Shape of one table kind: where it lives, how many rows, the record
/// layout, and which fields the document may overwrite.
#[derive(Debug)]
pub struct TableLayout {
    pub file_name: &'static str,
    pub record_count: usize,
    pub fields: &'static [FieldDef],
    pub patchable: &'static [&'static str],
}

impl TableLayout {
    pub fn record_width(&self) -> usize {
        self.fields.iter().map(|f| f.kind.width()).sum()
    }

    pub fn file_len(&self) -> usize {
        self.record_count * self.record_width()
    }

    pub fn field(&self, name: &str) -> Option<(usize, FieldKind)> {
        let mut offset = 0;
        for field in self.fields {
            if field.name == name {
                return Some((offset, field.kind));
            }
            offset += field.kind.width();
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOrigin {
    Working(PathBuf),
    Root(PathBuf),
    Synthesized,
}

#[derive(Debug, Clone)]
pub struct SpecTable {
    layout: &'static TableLayout,
    data: Vec<u8>,
    origin: TableOrigin,
}

impl SpecTable {
    /// A table of default records: all numbers zero, text blank, and a
    /// `name` field (if any) set to `#<row>`.
    pub fn defaults(layout: &'static TableLayout) -> Self {
        let width = layout.record_width();
        let mut data = Vec::with_capacity(layout.file_len());
        for row in 0..layout.record_count {
            let mut record = vec![0u8; width];
            let mut offset = 0;
            for field in layout.fields {
                if let FieldKind::Text(w) = field.kind {
                    let cell = &mut record[offset..offset + w];
                    cell.fill(b' ');
                    if field.name == "name" {
                        let label = format!("#{}", row + 1);
                        let n = label.len().min(w);
                        cell[..n].copy_from_slice(&label.as_bytes()[..n]);
                    }
                }
                offset += field.kind.width();
            }
            data.extend_from_slice(&record);
        }
        Self {
            layout,
            data,
            origin: TableOrigin::Synthesized,
        }
    }

    /// Wrap existing file contents. Short files are completed with default
    /// records, excess bytes are dropped.
    pub fn from_bytes(layout: &'static TableLayout, bytes: &[u8], origin: TableOrigin) -> Self {
        let expected = layout.file_len();
        let mut table = Self::defaults(layout);
        if bytes.len() != expected {
            warn!(
                "{}: expected {} bytes, found {}; missing records use defaults",
                layout.file_name,
                expected,
                bytes.len()
            );
        }
        let n = bytes.len().min(expected);
        table.data[..n].copy_from_slice(&bytes[..n]);
        table.origin = origin;
        table
    }

    /// Load from the working directory, then from `root_dir`, else
    /// synthesize defaults. Never fails.
    pub fn load(layout: &'static TableLayout, working_dir: &Path, root_dir: Option<&Path>) -> Self {
        let primary = working_dir.join(layout.file_name);
        if let Ok(bytes) = fs::read(&primary) {
            debug!("loaded {} from {}", layout.file_name, primary.display());
            return Self::from_bytes(layout, &bytes, TableOrigin::Working(primary));
        }
        if let Some(root) = root_dir {
            let fallback = root.join(layout.file_name);
            if let Ok(bytes) = fs::read(&fallback) {
                debug!("loaded {} from {}", layout.file_name, fallback.display());
                return Self::from_bytes(layout, &bytes, TableOrigin::Root(fallback));
            }
        }
        debug!("{} not found, using defaults", layout.file_name);
        Self::defaults(layout)
    }

    pub fn layout(&self) -> &'static TableLayout {
        self.layout
    }

    pub fn origin(&self) -> &TableOrigin {
        &self.origin
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Merge `rows` into the table. Each row is a mapping carrying an `id`;
    /// rows with an id outside `1..=record_count` are ignored, and only
    /// fields both present in the row and listed as patchable are written.
    /// Returns the number of rows applied.
    pub fn patch(&mut self, rows: &[Value]) -> usize {
        let mut applied = 0;
        for row in rows {
            let Some(id) = row.int("id") else {
                continue;
            };
            if id < 1 || id as usize > self.layout.record_count {
                continue;
            }
            for &name in self.layout.patchable {
                if let Some(value) = row.get(name) {
                    self.set_cell(id as usize, name, value);
                }
            }
            applied += 1;
        }
        applied
    }

    /// Overwrite one cell of a 1-based record. Values of the wrong shape
    /// (null, a list for a number) leave the cell untouched.
    pub fn set_cell(&mut self, id: usize, name: &str, value: &Value) -> bool {
        let Some((offset, kind)) = self.layout.field(name) else {
            return false;
        };
        let Some(start) = self.cell_start(id, offset) else {
            return false;
        };
        match kind {
            FieldKind::Text(width) => {
                let Some(text) = value.as_bytes() else {
                    return false;
                };
                let cell = &mut self.data[start..start + width];
                cell.fill(b' ');
                let n = text.len().min(width);
                cell[..n].copy_from_slice(&text[..n]);
            }
            FieldKind::U16 => {
                let Some(v) = value.as_i64() else {
                    return false;
                };
                self.data[start..start + 2].copy_from_slice(&(v as u16).to_le_bytes());
            }
            FieldKind::U32 => {
                let Some(v) = value.as_i64() else {
                    return false;
                };
                self.data[start..start + 4].copy_from_slice(&(v as u32).to_le_bytes());
            }
        }
        true
    }

    pub fn get_u16(&self, id: usize, name: &str) -> Option<u16> {
        let (offset, kind) = self.layout.field(name)?;
        if kind != FieldKind::U16 {
            return None;
        }
        let start = self.cell_start(id, offset)?;
        Some(u16::from_le_bytes([self.data[start], self.data[start + 1]]))
    }

    pub fn get_u32(&self, id: usize, name: &str) -> Option<u32> {
        let (offset, kind) = self.layout.field(name)?;
        if kind != FieldKind::U32 {
            return None;
        }
        let start = self.cell_start(id, offset)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.data[start..start + 4]);
        Some(u32::from_le_bytes(buf))
    }

    /// Text cell with trailing padding removed.
    pub fn get_text(&self, id: usize, name: &str) -> Option<&[u8]> {
        let (offset, kind) = self.layout.field(name)?;
        let FieldKind::Text(width) = kind else {
            return None;
        };
        let start = self.cell_start(id, offset)?;
        let cell = &self.data[start..start + width];
        let end = cell
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map_or(0, |p| p + 1);
        Some(&cell[..end])
    }

    fn cell_start(&self, id: usize, offset: usize) -> Option<usize> {
        if id == 0 || id > self.layout.record_count {
            return None;
        }
        Some((id - 1) * self.layout.record_width() + offset)
    }

    pub fn save(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(self.layout.file_name);
        let mut w = LittleEndianWriter::new(Vec::with_capacity(self.data.len()));
        w.write_bytes(&self.data)?;
        fs::write(&path, w.into_inner())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{SpecTable, TableLayout, TableOrigin, dword, text, word};
    use crate::document::{Number, Value, parse};

    static SAMPLE: TableLayout = TableLayout {
        file_name: "sample.dat",
        record_count: 3,
        fields: &[text("name", 6), word("picture"), word("cost"), dword("range")],
        patchable: &["name", "cost", "range"],
    };

    fn rows(text: &str) -> Vec<Value> {
        parse(text.as_bytes())
            .expect("rows parse")
            .as_list()
            .expect("list")
            .to_vec()
    }

    #[test]
    fn defaults_label_names_by_row() {
        let table = SpecTable::defaults(&SAMPLE);
        assert_eq!(table.as_bytes().len(), 3 * 14);
        assert_eq!(table.get_text(1, "name"), Some(&b"#1"[..]));
        assert_eq!(table.get_text(3, "name"), Some(&b"#3"[..]));
        assert_eq!(table.get_u16(2, "cost"), Some(0));
        assert_eq!(table.origin(), &TableOrigin::Synthesized);
    }

    #[test]
    fn patch_overwrites_only_supplied_fields() {
        let mut table = SpecTable::defaults(&SAMPLE);
        table.set_cell(2, "picture", &Value::Number(Number::Int(77)));
        table.set_cell(2, "cost", &Value::Number(Number::Int(5)));

        let applied = table.patch(&rows(r#"[{"id":2,"name":"Laser","range":70000,"picture":9}]"#));

        assert_eq!(applied, 1);
        assert_eq!(table.get_text(2, "name"), Some(&b"Laser"[..]));
        assert_eq!(table.get_u32(2, "range"), Some(70000));
        // Not supplied: untouched rather than zeroed.
        assert_eq!(table.get_u16(2, "cost"), Some(5));
        // Supplied but not patchable.
        assert_eq!(table.get_u16(2, "picture"), Some(77));
    }

    #[test]
    fn patch_ignores_ids_out_of_range() {
        let mut table = SpecTable::defaults(&SAMPLE);
        let before = table.as_bytes().to_vec();
        let applied = table.patch(&rows(r#"[{"id":0,"cost":1},{"id":4,"cost":1},{"cost":1}]"#));
        assert_eq!(applied, 0);
        assert_eq!(table.as_bytes(), &before[..]);
    }

    #[test]
    fn patch_is_idempotent() {
        let source = rows(r#"[{"id":1,"name":"Mark 1","cost":3},{"id":3,"range":12}]"#);
        let mut once = SpecTable::defaults(&SAMPLE);
        once.patch(&source);
        let mut twice = once.clone();
        twice.patch(&source);
        assert_eq!(once.as_bytes(), twice.as_bytes());
    }

    #[test]
    fn null_and_mistyped_values_leave_cells_alone() {
        let mut table = SpecTable::defaults(&SAMPLE);
        table.patch(&rows(r#"[{"id":1,"cost":null,"name":12,"range":[1]}]"#));
        assert_eq!(table.get_u16(1, "cost"), Some(0));
        assert_eq!(table.get_text(1, "name"), Some(&b"#1"[..]));
        assert_eq!(table.get_u32(1, "range"), Some(0));
    }

    #[test]
    fn short_files_are_completed_with_defaults() {
        let bytes = b"Blade \x01\x00\x02\x00\x03\x00\x00\x00";
        let table = SpecTable::from_bytes(&SAMPLE, bytes, TableOrigin::Synthesized);
        assert_eq!(table.get_text(1, "name"), Some(&b"Blade"[..]));
        assert_eq!(table.get_u16(1, "picture"), Some(1));
        assert_eq!(table.get_text(2, "name"), Some(&b"#2"[..]));
    }

    #[test]
    fn load_prefers_working_dir_then_root() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let base = std::env::temp_dir().join(format!("spec_table_{}_{nanos}", std::process::id()));
        let working = base.join("game");
        let root = base.join("root");
        fs::create_dir_all(&working).expect("mkdir working");
        fs::create_dir_all(&root).expect("mkdir root");

        let mut from_root = SpecTable::defaults(&SAMPLE);
        from_root.patch(&rows(r#"[{"id":1,"name":"Root"}]"#));
        from_root.save(&root).expect("save root");

        let loaded = SpecTable::load(&SAMPLE, &working, Some(&root));
        assert_eq!(loaded.get_text(1, "name"), Some(&b"Root"[..]));
        assert!(matches!(loaded.origin(), TableOrigin::Root(_)));

        let mut local = SpecTable::defaults(&SAMPLE);
        local.patch(&rows(r#"[{"id":1,"name":"Local"}]"#));
        local.save(&working).expect("save working");

        let loaded = SpecTable::load(&SAMPLE, &working, Some(&root));
        assert_eq!(loaded.get_text(1, "name"), Some(&b"Local"[..]));
        assert!(matches!(loaded.origin(), TableOrigin::Working(_)));

        let missing = SpecTable::load(&SAMPLE, &base.join("nowhere"), None);
        assert_eq!(missing.origin(), &TableOrigin::Synthesized);

        let _ = fs::remove_dir_all(&base);
    }
}
