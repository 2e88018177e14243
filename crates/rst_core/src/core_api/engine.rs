use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::info;

use crate::diagnostics::Diagnostics;
use crate::document::{self, Value};
use crate::game::{GameState, PlayerIdentity};
use crate::layout::{RESULT_HEADER_LEN, SectionId};
use crate::rst::ResultWriter;
use crate::rst::messages::{encode_messages, inbox};
use crate::rst::sections::{
    BaseContext, GenerationInput, encode_bases, encode_combats, encode_generation,
    encode_planets, encode_ship_xy, encode_ships, encode_targets,
};
use crate::shiplist::{
    BEAMSPEC, ENGSPEC, HULLFUNC_FILE, HULLSPEC, PLANET_NAMES, TORPSPEC, TRUEHULL, XYPLAN,
    hull_ability_rules, merge_truehull,
};
use crate::spec_table::{SpecTable, TableLayout, TableOrigin};
use crate::util_dat::{AlliedBase, UtilInput, encode_util};

use super::error::{CoreError, CoreErrorCode};
use super::types::{FileReport, OutputKind, SectionReport, UnpackOptions, UnpackReport};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Spec tables patched from document collections, in write order.
static PATCHED_TABLES: [(&TableLayout, &str); 6] = [
    (&BEAMSPEC, "beams"),
    (&TORPSPEC, "torpedos"),
    (&ENGSPEC, "engines"),
    (&HULLSPEC, "hulls"),
    (&XYPLAN, "planets"),
    (&PLANET_NAMES, "planets"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

#[derive(Debug)]
pub struct Session {
    document: Value,
    identity: PlayerIdentity,
}

/// Inflate gzip transport compression; anything else passes through.
pub fn decode_transport(bytes: &[u8]) -> Result<Cow<'_, [u8]>, CoreError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| CoreError::io("gzip document", e))?;
    Ok(Cow::Owned(out))
}

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Decode and parse a fetched document and validate whose turn it is.
    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CoreError> {
        let raw = decode_transport(bytes.as_ref())?;
        let document = document::parse(&raw)?;
        let identity = GameState::from_document(&document)?.player;
        Ok(Session { document, identity })
    }

    pub fn open_path(&self, path: &Path) -> Result<Session, CoreError> {
        let bytes = fs::read(path).map_err(|e| CoreError::io(path.display(), e))?;
        self.open_bytes(bytes)
    }
}

struct Outputs {
    dir: PathBuf,
    files: Vec<FileReport>,
}

impl Outputs {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: Vec::new(),
        }
    }

    fn record(&mut self, path: &Path, kind: OutputKind, bytes: usize) {
        info!("wrote {} ({} bytes)", path.display(), bytes);
        self.files.push(FileReport {
            path: path.display().to_string(),
            kind,
            bytes,
        });
    }

    fn write(&mut self, name: &str, kind: OutputKind, bytes: &[u8]) -> Result<PathBuf, CoreError> {
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|e| CoreError::io(path.display(), e))?;
        self.record(&path, kind, bytes.len());
        Ok(path)
    }
}

impl Session {
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    pub fn state(&self) -> Result<GameState<'_>, CoreError> {
        GameState::from_document(&self.document)
    }

    /// Canonical text form of the document or of the subtree at `path`.
    pub fn dump(&self, path: Option<&str>) -> Result<String, CoreError> {
        let node = match path {
            Some(path) => self.document.pointer(path).ok_or_else(|| {
                CoreError::new(CoreErrorCode::Schema, format!("no value at path {path}"))
            })?,
            None => &self.document,
        };
        Ok(node.to_string())
    }

    /// Full conversion: spec tables, hull functions, truehull, result file,
    /// util file and combat file. Files from completed stages stay on disk
    /// if a later stage fails.
    pub fn unpack(&self, options: &UnpackOptions) -> Result<UnpackReport, CoreError> {
        let game = self.state()?;
        let race = game.player.race;
        let dir = options.output_dir.as_path();
        let root = options.root_dir.as_deref();
        fs::create_dir_all(dir).map_err(|e| CoreError::io(dir.display(), e))?;

        let mut diag = Diagnostics::new();
        let mut out = Outputs::new(dir);

        let mut hullspec = None;
        for &(layout, collection) in PATCHED_TABLES.iter() {
            let mut table = SpecTable::load(layout, dir, root);
            let is_hullspec = std::ptr::eq(layout, &HULLSPEC);
            if is_hullspec && matches!(table.origin(), TableOrigin::Synthesized) {
                diag.warn(format!(
                    "{} not found; hull pictures are unknown and default to 0",
                    layout.file_name
                ));
            }
            table.patch(game.collection(collection));
            save_table(&table, &mut out)?;
            if is_hullspec {
                hullspec = Some(table);
            }
        }
        let hullspec = hullspec.unwrap_or_else(|| SpecTable::defaults(&HULLSPEC));

        let rules = hull_ability_rules(game.collection("hulls"));
        out.write(HULLFUNC_FILE, OutputKind::HullFunctions, rules.as_bytes())?;

        let mut truehull = SpecTable::load(&TRUEHULL, dir, root);
        merge_truehull(&mut truehull, &game.race_hulls(), race as usize);
        save_table(&truehull, &mut out)?;

        let sections = if options.write_result {
            write_result_file(&game, &hullspec, &mut diag, &mut out)?
        } else {
            Vec::new()
        };

        let util = encode_util_file(&game).map_err(io_err("util file"))?;
        out.write(&format!("util{race}.dat"), OutputKind::Util, &util)?;

        if options.write_vcr_file {
            emit_combat_file(&game, &hullspec, &mut out)?;
        }

        Ok(UnpackReport {
            player_id: game.player.player_id,
            race,
            turn: game.turn(),
            files: out.files,
            sections,
            warnings: diag.into_warnings(),
        })
    }

    /// Only the combat file; hull pictures come from whatever hullspec is
    /// on disk, patched in memory.
    pub fn write_combat_file(&self, options: &UnpackOptions) -> Result<FileReport, CoreError> {
        let game = self.state()?;
        let dir = options.output_dir.as_path();
        fs::create_dir_all(dir).map_err(|e| CoreError::io(dir.display(), e))?;

        let mut hullspec = SpecTable::load(&HULLSPEC, dir, options.root_dir.as_deref());
        hullspec.patch(game.collection("hulls"));
        let mut out = Outputs::new(dir);
        emit_combat_file(&game, &hullspec, &mut out)?;
        out.files
            .pop()
            .ok_or_else(|| CoreError::new(CoreErrorCode::InvalidState, "combat file not written"))
    }
}

fn save_table(table: &SpecTable, out: &mut Outputs) -> Result<(), CoreError> {
    let path = table
        .save(&out.dir)
        .map_err(|e| CoreError::io(table.layout().file_name, e))?;
    out.record(&path, OutputKind::SpecTable, table.as_bytes().len());
    Ok(())
}

fn io_err(what: &'static str) -> impl FnOnce(io::Error) -> CoreError {
    move |e| CoreError::io(what, e)
}

fn encode_util_file(game: &GameState<'_>) -> io::Result<Vec<u8>> {
    let planets = game.planets();
    let allied: Vec<AlliedBase> = game
        .starbases()
        .iter()
        .filter_map(|base| {
            let owner = game.base_owner(base, &planets);
            (owner != 0 && owner != game.player.player_id).then(|| AlliedBase {
                base_id: base.planet_id,
                owner_race: game.races.race_of(owner),
            })
        })
        .collect();
    let game_name = game.game_name();
    encode_util(&UtilInput {
        timestamp: game.timestamp(),
        turn: game.turn(),
        race: game.player.race,
        game_name: &game_name,
        scores: &game.scores(),
        storms: &game.ion_storms(),
        minefields: &game.minefields(),
        allied_bases: &allied,
    })
}

fn emit_combat_file(
    game: &GameState<'_>,
    hullspec: &SpecTable,
    out: &mut Outputs,
) -> Result<(), CoreError> {
    let bytes = encode_combats(&game.combats(), hullspec).map_err(io_err("combat file"))?;
    out.write(
        &format!("vcr{}.dat", game.player.race),
        OutputKind::Combat,
        &bytes,
    )?;
    Ok(())
}

/// Assemble `player<race>.rst` under a temporary name and move it into place
/// once the header is final.
fn write_result_file(
    game: &GameState<'_>,
    hullspec: &SpecTable,
    diag: &mut Diagnostics,
    out: &mut Outputs,
) -> Result<Vec<SectionReport>, CoreError> {
    let race = game.player.race;

    let own_ships = game.own_ships();
    let foreign_ships = game.foreign_ships();
    let planets = game.planets();
    let starbases = game.starbases();
    let own_bases: Vec<_> = starbases
        .iter()
        .filter(|base| game.base_owner(base, &planets) == game.player.player_id)
        .collect();
    let stock = game.stock();
    let race_hulls = game.race_hulls();

    let ships = encode_ships(&own_ships, &game.races, diag).map_err(io_err("ships"))?;
    let targets = encode_targets(&foreign_ships).map_err(io_err("targets"))?;
    let planet_bytes = encode_planets(&planets).map_err(io_err("planets"))?;
    let ctx = BaseContext {
        player_race: race,
        stock: &stock,
        race_hulls: &race_hulls,
    };
    let bases = encode_bases(&own_bases, &ctx, diag).map_err(io_err("bases"))?;
    let all_ships: Vec<_> = own_ships.iter().chain(&foreign_ships).cloned().collect();
    let ship_xy = encode_ship_xy(&all_ships).map_err(io_err("ship positions"))?;
    let generation = encode_generation(&GenerationInput {
        timestamp: game.timestamp(),
        turn: game.turn(),
        race,
        scores: &game.scores(),
        ships: &ships,
        planets: &planet_bytes,
        bases: &bases,
    })
    .map_err(io_err("generation"))?;
    let combats = encode_combats(&game.combats(), hullspec).map_err(io_err("combats"))?;

    let final_path = out.dir.join(format!("player{race}.rst"));
    let tmp_path = out.dir.join(format!("player{race}.rst.tmp"));
    let file = File::create(&tmp_path).map_err(|e| CoreError::io(tmp_path.display(), e))?;
    let mut writer = ResultWriter::new(BufWriter::new(file));
    writer.begin()?;

    let mut reports = Vec::with_capacity(SectionId::BODY_ORDER.len());
    let mut emit = |writer: &mut ResultWriter<BufWriter<File>>,
                    id: SectionId,
                    bytes: &[u8]|
     -> Result<(), CoreError> {
        let offset = writer.next_offset()?;
        writer.write_section(id, bytes)?;
        reports.push(SectionReport {
            name: id.as_str().to_string(),
            offset,
            length: bytes.len(),
        });
        Ok(())
    };

    emit(&mut writer, SectionId::Ships, &ships)?;
    emit(&mut writer, SectionId::Targets, &targets)?;
    emit(&mut writer, SectionId::Planets, &planet_bytes)?;
    emit(&mut writer, SectionId::Bases, &bases)?;
    let texts = inbox(&game.messages(), game.settings());
    let messages = encode_messages(&texts, writer.next_offset()?).map_err(io_err("messages"))?;
    emit(&mut writer, SectionId::Messages, &messages)?;
    emit(&mut writer, SectionId::ShipXy, &ship_xy)?;
    emit(&mut writer, SectionId::Generation, &generation)?;
    emit(&mut writer, SectionId::Combat, &combats)?;
    writer.finish()?;
    drop(writer.into_inner()?);

    fs::rename(&tmp_path, &final_path).map_err(|e| CoreError::io(final_path.display(), e))?;
    let len = RESULT_HEADER_LEN + reports.iter().map(|r| r.length).sum::<usize>();
    out.record(&final_path, OutputKind::Result, len);
    Ok(reports)
}
