//! `util<race>.dat`: a stream of `(type, length, payload)` records carrying
//! information the result file has no room for.

use std::io;

use crate::game::{IonStorm, Minefield, ScoreEntry};
use crate::shiplist::RACE_COUNT;
use crate::writer::{LittleEndianWriter, encode_to_vec};

pub const RECORD_MINEFIELD: u16 = 0;
pub const RECORD_ALLIED_BASE: u16 = 11;
pub const RECORD_CONTROL: u16 = 13;
pub const RECORD_ION_STORM: u16 = 17;
pub const RECORD_SCORE: u16 = 51;

const SCORE_NAME_LEN: usize = 50;
const GAME_NAME_LEN: usize = 32;
const DIGEST_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    Military,
    Inventory,
    PriorityPoints,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 3] = [Self::Military, Self::Inventory, Self::PriorityPoints];

    pub fn name(self) -> &'static str {
        match self {
            Self::Military => "Military Score",
            Self::Inventory => "Inventory Score",
            Self::PriorityPoints => "Priority Points",
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Self::Military => 1,
            Self::Inventory => 2,
            Self::PriorityPoints => 3,
        }
    }

    fn value(self, entry: &ScoreEntry) -> Option<i64> {
        match self {
            Self::Military => entry.military,
            Self::Inventory => entry.inventory,
            Self::PriorityPoints => entry.priority_points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlliedBase {
    /// Planet id the base sits on.
    pub base_id: i64,
    pub owner_race: i64,
}

#[derive(Debug)]
pub struct UtilInput<'a> {
    pub timestamp: [u8; 18],
    pub turn: i64,
    pub race: i64,
    pub game_name: &'a [u8],
    pub scores: &'a [ScoreEntry],
    pub storms: &'a [IonStorm],
    pub minefields: &'a [Minefield],
    pub allied_bases: &'a [AlliedBase],
}

fn write_record<W: io::Write>(
    w: &mut LittleEndianWriter<W>,
    record_type: u16,
    payload: &[u8],
) -> io::Result<()> {
    w.write_u16(record_type)?;
    w.write_u16(payload.len() as u16)?;
    w.write_bytes(payload)
}

fn score_per_race(kind: ScoreKind, scores: &[ScoreEntry], turn: i64) -> [i64; RACE_COUNT] {
    let mut cells = [-1i64; RACE_COUNT];
    for entry in scores.iter().filter(|s| s.turn == turn) {
        if let Some(value) = kind.value(entry)
            && (1..=RACE_COUNT as i64).contains(&entry.race)
        {
            cells[entry.race as usize - 1] = value;
        }
    }
    cells
}

pub fn encode_util(input: &UtilInput<'_>) -> io::Result<Vec<u8>> {
    let control = encode_to_vec(|w| {
        w.write_bytes(&input.timestamp)?;
        w.write_word(input.turn)?;
        w.write_word(input.race)?;
        w.write_bytes(&[0, 0])?;
        w.write_fill(0, DIGEST_LEN)?;
        w.write_fixed_text(input.game_name, GAME_NAME_LEN, b' ')
    })?;

    let mut scores = Vec::with_capacity(ScoreKind::ALL.len());
    for kind in ScoreKind::ALL {
        let cells = score_per_race(kind, input.scores, input.turn);
        scores.push(encode_to_vec(|w| {
            w.write_fixed_text(kind.name().as_bytes(), SCORE_NAME_LEN, b' ')?;
            w.write_u16(kind.id())?;
            w.write_word(-1)?;
            w.write_i32(-1)?;
            for cell in cells {
                w.write_i32(cell as i32)?;
            }
            Ok(())
        })?);
    }

    encode_to_vec(|w| {
        write_record(w, RECORD_CONTROL, &control)?;
        for payload in &scores {
            write_record(w, RECORD_SCORE, payload)?;
        }
        for storm in input.storms {
            let payload = encode_to_vec(|p| {
                p.write_words(&[
                    storm.id,
                    storm.x,
                    storm.y,
                    storm.voltage,
                    storm.heading,
                    storm.warp,
                    storm.radius,
                    storm.class(),
                    i64::from(storm.growing),
                ])
            })?;
            write_record(w, RECORD_ION_STORM, &payload)?;
        }
        // Older minefields are already known to the client.
        for field in input.minefields.iter().filter(|m| m.info_turn == input.turn) {
            let payload = encode_to_vec(|p| {
                p.write_words(&[field.id, field.x, field.y, field.race])?;
                p.write_dword(field.units)?;
                p.write_word(i64::from(field.is_web))
            })?;
            write_record(w, RECORD_MINEFIELD, &payload)?;
        }
        for base in input.allied_bases {
            let payload = encode_to_vec(|p| p.write_words(&[base.base_id, base.owner_race]))?;
            write_record(w, RECORD_ALLIED_BASE, &payload)?;
        }
        Ok(())
    })
}
