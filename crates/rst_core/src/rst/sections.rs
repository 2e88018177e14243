//! Encoders for the individual result file sections. Each returns the
//! section bytes; count-prefixed sections start with a u16 record count.

use std::io;

use crate::checksum::checksum;
use crate::diagnostics::Diagnostics;
use crate::game::{
    Combat, Combatant, Planet, RaceMap, ScoreEntry, Ship, Starbase, StockEntry, Transfer,
};
use crate::shiplist::{HULLS_PER_RACE, RACE_COUNT};
use crate::spec_table::SpecTable;
use crate::writer::{LittleEndianWriter, encode_to_vec};

pub const SHIP_RECORD_LEN: usize = 107;
pub const TARGET_RECORD_LEN: usize = 34;
pub const PLANET_RECORD_LEN: usize = 85;
pub const BASE_RECORD_LEN: usize = 156;
pub const COMBAT_RECORD_LEN: usize = 100;
pub const SHIP_XY_SLOTS: usize = 999;
pub const GENERATION_LEN: usize = 144;

const NAME_LEN: usize = 20;
const PLACEHOLDER_FCODE: &[u8] = b"???";
const PASSWORD: &[u8] = b"NOPASSWORD";
const PASSWORD_LEN: usize = 20;

/// Marks recordings as produced from a Nu document ("NU").
pub const VCR_SIGNATURE: i64 = 0x554E;

const MISSION_TOW: i64 = 6;
const MISSION_INTERCEPT: i64 = 7;

const ENGINE_SLOTS: usize = 9;
const BEAM_SLOTS: usize = 10;
const TORPEDO_SLOTS: usize = 10;

fn write_count<W: io::Write>(w: &mut LittleEndianWriter<W>, n: usize) -> io::Result<()> {
    w.write_word(n as i64)
}

/// Missions are 0-based in the document, 1-based in the result file.
/// Negative values mean "no mission" and pass through.
pub fn legacy_mission(mission: i64) -> i64 {
    if mission >= 0 { mission + 1 } else { mission }
}

fn write_cargo_block<W: io::Write>(
    w: &mut LittleEndianWriter<W>,
    transfer: &Transfer,
    wanted_type: i64,
) -> io::Result<()> {
    if transfer.target_type != wanted_type {
        return w.write_fill(0, 14);
    }
    let c = &transfer.cargo;
    w.write_words(&[
        c.neutronium,
        c.tritanium,
        c.duranium,
        c.molybdenum,
        c.clans,
        c.supplies,
        transfer.target_id,
    ])
}

fn write_ship<W: io::Write>(
    w: &mut LittleEndianWriter<W>,
    ship: &Ship,
    races: &RaceMap,
) -> io::Result<()> {
    w.write_words(&[ship.id, ship.race])?;
    w.write_fixed_text(&ship.friendly_code, 3, b' ')?;
    w.write_words(&[
        ship.warp,
        ship.target_x - ship.x,
        ship.target_y - ship.y,
        ship.x,
        ship.y,
        ship.engine,
        ship.hull,
        ship.beam,
        ship.beams,
        ship.bays,
        ship.torpedo,
        ship.ammo,
        ship.launchers,
        legacy_mission(ship.mission),
        races.race_of(ship.enemy),
        if ship.mission == MISSION_TOW { ship.mission_target } else { 0 },
        ship.damage,
        ship.crew,
        ship.cargo.clans,
    ])?;
    w.write_fixed_text(&ship.name, NAME_LEN, b' ')?;
    let c = &ship.cargo;
    w.write_words(&[c.neutronium, c.tritanium, c.duranium, c.molybdenum, c.supplies])?;
    write_cargo_block(w, &ship.transfer, Transfer::TO_PLANET)?;
    write_cargo_block(w, &ship.transfer, Transfer::TO_SHIP)?;
    w.write_word(if ship.mission == MISSION_INTERCEPT {
        ship.mission_target
    } else {
        0
    })?;
    w.write_word(ship.megacredits)
}

/// Own ships, full records.
pub fn encode_ships(
    ships: &[Ship],
    races: &RaceMap,
    diag: &mut Diagnostics,
) -> io::Result<Vec<u8>> {
    for ship in ships {
        if ship.transfer.megacredits != 0 || ship.transfer.ammo != 0 {
            diag.warn(format!(
                "ship {}: transfer of {} megacredits and {} ammo cannot be represented",
                ship.id, ship.transfer.megacredits, ship.transfer.ammo
            ));
        }
    }
    encode_to_vec(|w| {
        write_count(w, ships.len())?;
        for ship in ships {
            write_ship(w, ship, races)?;
        }
        Ok(())
    })
}

/// Foreign ships, contact records.
pub fn encode_targets(ships: &[Ship]) -> io::Result<Vec<u8>> {
    encode_to_vec(|w| {
        write_count(w, ships.len())?;
        for ship in ships {
            w.write_words(&[
                ship.id,
                ship.race,
                ship.warp,
                ship.x,
                ship.y,
                ship.hull,
                ship.heading,
            ])?;
            w.write_fixed_text(&ship.name, NAME_LEN, b' ')?;
        }
        Ok(())
    })
}

fn planet_counters(p: &Planet) -> [i64; 25] {
    [
        p.mines,
        p.factories,
        p.defense,
        p.neutronium,
        p.tritanium,
        p.duranium,
        p.molybdenum,
        p.clans,
        p.supplies,
        p.megacredits,
        p.ground_neutronium,
        p.ground_tritanium,
        p.ground_duranium,
        p.ground_molybdenum,
        p.density_neutronium,
        p.density_tritanium,
        p.density_duranium,
        p.density_molybdenum,
        p.colonist_tax,
        p.native_tax,
        p.colonist_happiness,
        p.native_happiness,
        p.native_government,
        p.native_clans,
        p.native_type,
    ]
}

/// A planet is reported if its friendly code is set or anything about it
/// is known.
pub fn planet_is_reported(planet: &Planet) -> bool {
    let code = planet.friendly_code.as_slice();
    let placeholder = code.is_empty() || code == PLACEHOLDER_FCODE;
    !placeholder || planet_counters(planet).iter().any(|&v| v > 0)
}

pub fn encode_planets(planets: &[Planet]) -> io::Result<Vec<u8>> {
    let reported: Vec<&Planet> = planets.iter().filter(|p| planet_is_reported(p)).collect();
    encode_to_vec(|w| {
        write_count(w, reported.len())?;
        for p in reported {
            w.write_words(&[p.race, p.id])?;
            w.write_fixed_text(&p.friendly_code, 3, b' ')?;
            w.write_words(&[p.mines, p.factories, p.defense])?;
            for v in [
                p.neutronium,
                p.tritanium,
                p.duranium,
                p.molybdenum,
                p.clans,
                p.supplies,
                p.megacredits,
                p.ground_neutronium,
                p.ground_tritanium,
                p.ground_duranium,
                p.ground_molybdenum,
            ] {
                w.write_dword(v)?;
            }
            w.write_words(&[
                p.density_neutronium,
                p.density_tritanium,
                p.density_duranium,
                p.density_molybdenum,
                p.colonist_tax,
                p.native_tax,
                p.colonist_happiness,
                p.native_happiness,
                p.native_government,
            ])?;
            w.write_dword(p.native_clans)?;
            w.write_words(&[
                p.native_type,
                p.temperature.map_or(-1, |t| 100 - t),
                i64::from(p.building_starbase),
            ])?;
        }
        Ok(())
    })
}

/// Everything the base encoder needs besides the bases themselves.
pub struct BaseContext<'a> {
    pub player_race: i64,
    pub stock: &'a [StockEntry],
    /// Hull ids of the player's build slots, slot 1 first.
    pub race_hulls: &'a [i64],
}

impl BaseContext<'_> {
    fn amount(&self, base_id: i64, stock_type: i64, stock_id: i64) -> i64 {
        self.stock
            .iter()
            .find(|s| {
                s.starbase_id == base_id && s.stock_type == stock_type && s.stock_id == stock_id
            })
            .map_or(0, |s| s.amount)
    }

    fn stock_block(&self, base_id: i64, stock_type: i64, slots: usize) -> Vec<i64> {
        (1..=slots as i64)
            .map(|id| self.amount(base_id, stock_type, id))
            .collect()
    }

    fn hull_slot(&self, hull: i64) -> Option<usize> {
        if hull <= 0 {
            return None;
        }
        self.race_hulls
            .iter()
            .take(HULLS_PER_RACE)
            .position(|&h| h == hull)
            .map(|idx| idx + 1)
    }
}

/// Own starbases; `bases` must already be filtered to the player's planets.
pub fn encode_bases(
    bases: &[&Starbase],
    ctx: &BaseContext<'_>,
    diag: &mut Diagnostics,
) -> io::Result<Vec<u8>> {
    let mut build_slots = Vec::with_capacity(bases.len());
    for base in bases {
        let slot = match ctx.hull_slot(base.build_hull) {
            Some(slot) => slot as i64,
            None => {
                if base.is_building {
                    diag.warn(format!(
                        "starbase {}: hull {} is not in the build list, build order dropped",
                        base.planet_id, base.build_hull
                    ));
                }
                0
            }
        };
        build_slots.push(slot);
    }

    encode_to_vec(|w| {
        write_count(w, bases.len())?;
        for (base, slot) in bases.iter().zip(build_slots) {
            let id = base.planet_id;
            w.write_words(&[
                id,
                ctx.player_race,
                base.defense,
                base.damage,
                base.engine_tech,
                base.hull_tech,
                base.beam_tech,
                base.torpedo_tech,
            ])?;
            w.write_words(&ctx.stock_block(base.id, StockEntry::ENGINE, ENGINE_SLOTS))?;
            let hulls: Vec<i64> = (0..HULLS_PER_RACE)
                .map(|idx| match ctx.race_hulls.get(idx) {
                    Some(&hull) if hull > 0 => ctx.amount(base.id, StockEntry::HULL, hull),
                    _ => 0,
                })
                .collect();
            w.write_words(&hulls)?;
            w.write_words(&ctx.stock_block(base.id, StockEntry::BEAM, BEAM_SLOTS))?;
            w.write_words(&ctx.stock_block(base.id, StockEntry::LAUNCHER, TORPEDO_SLOTS))?;
            w.write_words(&ctx.stock_block(base.id, StockEntry::TORPEDO, TORPEDO_SLOTS))?;
            w.write_words(&[
                base.fighters,
                base.target_ship,
                base.ship_mission,
                base.mission,
                slot,
                base.build_engine,
                base.build_beam,
                base.build_beam_count,
                base.build_torpedo,
                base.build_torpedo_count,
                0,
            ])?;
        }
        Ok(())
    })
}

/// Direct-index position table over ship ids 1..=999. Not count-prefixed.
pub fn encode_ship_xy(ships: &[Ship]) -> io::Result<Vec<u8>> {
    let mut grid = vec![[0i64; 4]; SHIP_XY_SLOTS];
    for ship in ships {
        if (1..=SHIP_XY_SLOTS as i64).contains(&ship.id) {
            grid[ship.id as usize - 1] = [ship.x, ship.y, ship.race, ship.mass];
        }
    }
    encode_to_vec(|w| {
        for cell in &grid {
            w.write_words(cell)?;
        }
        Ok(())
    })
}

/// Sum of a count-prefixed section without its count, narrowed to the
/// 32-bit field it fills.
fn body_checksum(section: &[u8]) -> u32 {
    checksum(section.get(2..).unwrap_or_default()) as u32
}

pub struct GenerationInput<'a> {
    pub timestamp: [u8; 18],
    pub turn: i64,
    pub race: i64,
    pub scores: &'a [ScoreEntry],
    pub ships: &'a [u8],
    pub planets: &'a [u8],
    pub bases: &'a [u8],
}

/// Timestamp, score grid, identity and checksums of the other sections.
pub fn encode_generation(input: &GenerationInput<'_>) -> io::Result<Vec<u8>> {
    let mut grid = [0i64; RACE_COUNT * 4];
    for score in input.scores.iter().filter(|s| s.turn == input.turn) {
        if !(1..=RACE_COUNT as i64).contains(&score.race) {
            continue;
        }
        let base = (score.race as usize - 1) * 4;
        grid[base..base + 4].copy_from_slice(&[
            score.planets,
            score.capital_ships,
            score.freighters,
            score.starbases,
        ]);
    }

    encode_to_vec(|w| {
        w.write_bytes(&input.timestamp)?;
        w.write_words(&grid)?;
        w.write_word(input.race)?;
        w.write_fixed_text(PASSWORD, PASSWORD_LEN, 0)?;
        w.write_u32(body_checksum(input.ships))?;
        w.write_u32(body_checksum(input.planets))?;
        w.write_u32(body_checksum(input.bases))?;
        w.write_word(input.turn)?;
        w.write_word(checksum(&input.timestamp) as i64)
    })
}

fn write_combatant<W: io::Write>(
    w: &mut LittleEndianWriter<W>,
    side: &Combatant,
    hullspec: &SpecTable,
) -> io::Result<()> {
    let picture = match usize::try_from(side.hull) {
        Ok(hull) if hull > 0 => i64::from(hullspec.get_u16(hull, "picture").unwrap_or(0)),
        _ => 0,
    };
    let ammo = if side.torpedo > 0 {
        side.torpedoes
    } else {
        side.fighters
    };
    w.write_fixed_text(&side.name, NAME_LEN, b' ')?;
    w.write_words(&[
        side.damage,
        side.crew,
        side.object_id,
        side.race,
        picture | (side.hull << 8),
        side.beam,
        side.beam_count,
        side.bays,
        side.torpedo,
        ammo,
        side.launchers,
    ])
}

/// Combat recordings; shared by the result file and the standalone vcr file.
pub fn encode_combats(combats: &[Combat], hullspec: &SpecTable) -> io::Result<Vec<u8>> {
    encode_to_vec(|w| {
        write_count(w, combats.len())?;
        for combat in combats {
            w.write_words(&[
                combat.seed,
                VCR_SIGNATURE,
                combat.temperature,
                combat.battle_type,
                combat.left.mass,
                combat.right.mass,
            ])?;
            write_combatant(w, &combat.left, hullspec)?;
            write_combatant(w, &combat.right, hullspec)?;
            w.write_words(&[combat.left.shield, combat.right.shield])?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;
    use crate::game::RaceMap;
    use crate::shiplist::HULLSPEC;

    fn word(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn races() -> RaceMap {
        let mut races = RaceMap::default();
        races.insert(1, 3);
        races.insert(2, 9);
        races
    }

    fn ship(text: &str) -> Ship {
        let v = parse(text.as_bytes()).expect("parse");
        Ship::from_value(&v, &races())
    }

    #[test]
    fn ship_record_encodes_waypoint_delta_and_mission() {
        let s = ship(
            r#"{"id":5,"ownerid":1,"mission":-1,"warp":9,"x":1000,"y":1000,"targetx":1010,"targety":1000}"#,
        );
        let mut diag = Diagnostics::new();
        let bytes = encode_ships(&[s], &races(), &mut diag).expect("encode");
        assert_eq!(bytes.len(), 2 + SHIP_RECORD_LEN);
        assert_eq!(word(&bytes, 0), 1);
        assert_eq!(word(&bytes, 2), 5);
        assert_eq!(word(&bytes, 4), 3);
        assert_eq!(word(&bytes, 9), 9);
        assert_eq!(word(&bytes, 11) as i16, 10);
        assert_eq!(word(&bytes, 13) as i16, 0);
        assert_eq!(word(&bytes, 2 + 33) as i16, -1);
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn missions_shift_and_fill_secondary_targets() {
        assert_eq!(legacy_mission(0), 1);
        assert_eq!(legacy_mission(-1), -1);

        let tow = ship(r#"{"id":1,"ownerid":1,"mission":6,"mission1target":42}"#);
        let intercept = ship(r#"{"id":2,"ownerid":1,"mission":7,"mission1target":17}"#);
        let mut diag = Diagnostics::new();
        let bytes = encode_ships(&[tow, intercept], &races(), &mut diag).expect("encode");
        let first = 2;
        assert_eq!(word(&bytes, first + 33), 7);
        assert_eq!(word(&bytes, first + 37), 42);
        assert_eq!(word(&bytes, first + 103), 0);
        let second = 2 + SHIP_RECORD_LEN;
        assert_eq!(word(&bytes, second + 33), 8);
        assert_eq!(word(&bytes, second + 37), 0);
        assert_eq!(word(&bytes, second + 103), 17);
    }

    #[test]
    fn transfer_blocks_follow_target_type() {
        let unload = ship(
            r#"{"id":1,"ownerid":1,"transferneutronium":30,"transfertargetid":88,"transfertargettype":1}"#,
        );
        let mut diag = Diagnostics::new();
        let bytes = encode_ships(&[unload], &races(), &mut diag).expect("encode");
        assert_eq!(word(&bytes, 2 + 75), 30);
        assert_eq!(word(&bytes, 2 + 87), 88);
        assert!(bytes[2 + 89..2 + 103].iter().all(|&b| b == 0));

        let money =
            ship(r#"{"id":1,"ownerid":1,"transfermegacredits":100,"transfertargettype":2}"#);
        encode_ships(&[money], &races(), &mut diag).expect("encode");
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn target_records_are_fixed_width() {
        let s = ship(r#"{"id":9,"ownerid":2,"heading":270,"hullid":15,"name":"Raider"}"#);
        let bytes = encode_targets(&[s]).expect("encode");
        assert_eq!(bytes.len(), 2 + TARGET_RECORD_LEN);
        assert_eq!(word(&bytes, 4), 9);
        assert_eq!(word(&bytes, 14), 270);
        assert_eq!(&bytes[16..22], b"Raider");
    }

    #[test]
    fn planet_predicate_needs_code_or_data() {
        let mut planet = Planet {
            friendly_code: b"???".to_vec(),
            ..Planet::default()
        };
        assert!(!planet_is_reported(&planet));
        planet.native_clans = 1;
        assert!(planet_is_reported(&planet));
        planet.native_clans = 0;
        planet.friendly_code = b"abc".to_vec();
        assert!(planet_is_reported(&planet));
        planet.friendly_code.clear();
        planet.defense = -5;
        assert!(!planet_is_reported(&planet));
    }

    #[test]
    fn planet_record_inverts_temperature() {
        let planets = [
            Planet {
                id: 12,
                friendly_code: b"xyz".to_vec(),
                temperature: Some(30),
                ..Planet::default()
            },
            Planet {
                id: 13,
                friendly_code: b"???".to_vec(),
                ..Planet::default()
            },
        ];
        let bytes = encode_planets(&planets).expect("encode");
        assert_eq!(bytes.len(), 2 + PLANET_RECORD_LEN);
        assert_eq!(word(&bytes, 0), 1);
        assert_eq!(word(&bytes, 4), 12);
        assert_eq!(word(&bytes, 2 + 81), 70);
    }

    #[test]
    fn base_record_resolves_stock_and_build_slot() {
        let stock = [
            StockEntry {
                starbase_id: 3,
                stock_type: StockEntry::ENGINE,
                stock_id: 9,
                amount: 2,
            },
            StockEntry {
                starbase_id: 3,
                stock_type: StockEntry::HULL,
                stock_id: 17,
                amount: 1,
            },
            StockEntry {
                starbase_id: 4,
                stock_type: StockEntry::BEAM,
                stock_id: 1,
                amount: 5,
            },
        ];
        let hulls = [16, 17, 15];
        let ctx = BaseContext {
            player_race: 3,
            stock: &stock,
            race_hulls: &hulls,
        };
        let base = Starbase {
            id: 3,
            planet_id: 200,
            build_hull: 15,
            is_building: true,
            ..Starbase::default()
        };
        let mut diag = Diagnostics::new();
        let bytes = encode_bases(&[&base], &ctx, &mut diag).expect("encode");
        assert_eq!(bytes.len(), 2 + BASE_RECORD_LEN);
        let rec = &bytes[2..];
        assert_eq!(word(rec, 0), 200);
        assert_eq!(word(rec, 2), 3);
        assert_eq!(word(rec, 16 + 8 * 2), 2);
        assert_eq!(word(rec, 34 + 2), 1);
        assert_eq!(word(rec, 74), 0);
        assert_eq!(word(rec, 142), 3);
        assert!(diag.warnings().is_empty());

        let lost = Starbase { build_hull: 99, ..base };
        encode_bases(&[&lost], &ctx, &mut diag).expect("encode");
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn ship_grid_is_direct_indexed() {
        let s = ship(r#"{"id":999,"ownerid":2,"x":5,"y":6,"mass":300}"#);
        let far = ship(r#"{"id":1000,"ownerid":2,"x":5,"y":6}"#);
        let bytes = encode_ship_xy(&[s, far]).expect("encode");
        assert_eq!(bytes.len(), SHIP_XY_SLOTS * 8);
        let last = (SHIP_XY_SLOTS - 1) * 8;
        assert_eq!(
            [
                word(&bytes, last),
                word(&bytes, last + 4),
                word(&bytes, last + 6)
            ],
            [5, 9, 300]
        );
        assert!(bytes[..last].iter().all(|&b| b == 0));
    }

    #[test]
    fn generation_block_places_scores_and_checksums() {
        let scores = [
            ScoreEntry {
                race: 2,
                turn: 10,
                planets: 7,
                starbases: 1,
                ..ScoreEntry::default()
            },
            ScoreEntry {
                race: 3,
                turn: 9,
                planets: 4,
                ..ScoreEntry::default()
            },
        ];
        let input = GenerationInput {
            timestamp: *b"01-02-201303:04:05",
            turn: 10,
            race: 2,
            scores: &scores,
            ships: &[1, 0, 5, 6],
            planets: &[0, 0],
            bases: &[],
        };
        let bytes = encode_generation(&input).expect("encode");
        assert_eq!(bytes.len(), GENERATION_LEN);
        assert_eq!(word(&bytes, 18 + 4 * 2), 7);
        assert_eq!(word(&bytes, 18 + 7 * 2), 1);
        assert_eq!(word(&bytes, 18 + 8 * 2), 0);
        assert_eq!(word(&bytes, 106), 2);
        assert_eq!(&bytes[108..118], b"NOPASSWORD");
        assert_eq!(&bytes[128..132], &11u32.to_le_bytes());
        assert_eq!(word(&bytes, 140), 10);
        assert_eq!(u64::from(word(&bytes, 142)), checksum(b"01-02-201303:04:05"));
    }

    #[test]
    fn combat_record_packs_picture_and_ammo() {
        let mut hullspec = SpecTable::defaults(&HULLSPEC);
        let doc = parse(br#"[{"id":15,"picture":1}]"#).expect("parse");
        hullspec.patch(doc.as_list().expect("list"));
        let mut raw = hullspec.as_bytes().to_vec();
        raw[14 * 60 + 30] = 44;
        let hullspec = SpecTable::from_bytes(&HULLSPEC, &raw, hullspec.origin().clone());

        let combat = Combat {
            seed: 77,
            left: Combatant {
                hull: 15,
                torpedo: 3,
                torpedoes: 20,
                fighters: 8,
                mass: 120,
                ..Combatant::default()
            },
            right: Combatant {
                fighters: 40,
                shield: 100,
                ..Combatant::default()
            },
            ..Combat::default()
        };
        let bytes = encode_combats(&[combat], &hullspec).expect("encode");
        assert_eq!(bytes.len(), 2 + COMBAT_RECORD_LEN);
        let rec = &bytes[2..];
        assert_eq!(word(rec, 0), 77);
        assert_eq!(word(rec, 2), 0x554E);
        assert_eq!(&rec[2..4], b"NU");
        assert_eq!(word(rec, 8), 120);
        assert_eq!(word(rec, 12 + 20 + 8), 44 | (15 << 8));
        assert_eq!(word(rec, 12 + 20 + 18), 20);
        assert_eq!(word(rec, 54 + 20 + 18), 40);
        assert_eq!(word(rec, 98), 100);
    }
}
