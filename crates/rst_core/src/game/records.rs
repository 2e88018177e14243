use crate::document::Value;

use super::RaceMap;

fn int(v: &Value, key: &str) -> i64 {
    v.int(key).unwrap_or(0)
}

fn opt(v: &Value, key: &str) -> Option<i64> {
    v.int(key)
}

fn text(v: &Value, key: &str) -> Vec<u8> {
    v.bytes(key).map(<[u8]>::to_vec).unwrap_or_default()
}

fn flag(v: &Value, key: &str) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cargo {
    pub neutronium: i64,
    pub tritanium: i64,
    pub duranium: i64,
    pub molybdenum: i64,
    pub clans: i64,
    pub supplies: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfer {
    pub cargo: Cargo,
    pub target_id: i64,
    pub target_type: i64,
    pub megacredits: i64,
    pub ammo: i64,
}

impl Transfer {
    pub const TO_PLANET: i64 = 1;
    pub const TO_SHIP: i64 = 2;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ship {
    pub id: i64,
    pub owner: i64,
    pub race: i64,
    pub name: Vec<u8>,
    pub friendly_code: Vec<u8>,
    pub warp: i64,
    pub x: i64,
    pub y: i64,
    pub target_x: i64,
    pub target_y: i64,
    pub engine: i64,
    pub hull: i64,
    pub beam: i64,
    pub beams: i64,
    pub bays: i64,
    pub torpedo: i64,
    pub ammo: i64,
    pub launchers: i64,
    pub mission: i64,
    pub mission_target: i64,
    pub enemy: i64,
    pub damage: i64,
    pub crew: i64,
    pub cargo: Cargo,
    pub megacredits: i64,
    pub transfer: Transfer,
    pub heading: i64,
    pub mass: i64,
}

impl Ship {
    pub fn from_value(v: &Value, races: &RaceMap) -> Self {
        let owner = int(v, "ownerid");
        Self {
            id: int(v, "id"),
            owner,
            race: races.race_of(owner),
            name: text(v, "name"),
            friendly_code: text(v, "friendlycode"),
            warp: int(v, "warp"),
            x: int(v, "x"),
            y: int(v, "y"),
            target_x: opt(v, "targetx").unwrap_or_else(|| int(v, "x")),
            target_y: opt(v, "targety").unwrap_or_else(|| int(v, "y")),
            engine: int(v, "engineid"),
            hull: int(v, "hullid"),
            beam: int(v, "beamid"),
            beams: int(v, "beams"),
            bays: int(v, "bays"),
            torpedo: int(v, "torpedoid"),
            ammo: int(v, "ammo"),
            launchers: int(v, "torps"),
            mission: opt(v, "mission").unwrap_or(-1),
            mission_target: int(v, "mission1target"),
            enemy: int(v, "enemy"),
            damage: int(v, "damage"),
            crew: int(v, "crew"),
            cargo: Cargo {
                neutronium: int(v, "neutronium"),
                tritanium: int(v, "tritanium"),
                duranium: int(v, "duranium"),
                molybdenum: int(v, "molybdenum"),
                clans: int(v, "clans"),
                supplies: int(v, "supplies"),
            },
            megacredits: int(v, "megacredits"),
            transfer: Transfer {
                cargo: Cargo {
                    neutronium: int(v, "transferneutronium"),
                    tritanium: int(v, "transfertritanium"),
                    duranium: int(v, "transferduranium"),
                    molybdenum: int(v, "transfermolybdenum"),
                    clans: int(v, "transferclans"),
                    supplies: int(v, "transfersupplies"),
                },
                target_id: int(v, "transfertargetid"),
                target_type: int(v, "transfertargettype"),
                megacredits: int(v, "transfermegacredits"),
                ammo: int(v, "transferammo"),
            },
            heading: opt(v, "heading").unwrap_or(-1),
            mass: int(v, "mass"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Planet {
    pub id: i64,
    pub owner: i64,
    pub race: i64,
    pub name: Vec<u8>,
    pub x: i64,
    pub y: i64,
    pub friendly_code: Vec<u8>,
    pub mines: i64,
    pub factories: i64,
    pub defense: i64,
    pub neutronium: i64,
    pub tritanium: i64,
    pub duranium: i64,
    pub molybdenum: i64,
    pub clans: i64,
    pub supplies: i64,
    pub megacredits: i64,
    pub ground_neutronium: i64,
    pub ground_tritanium: i64,
    pub ground_duranium: i64,
    pub ground_molybdenum: i64,
    pub density_neutronium: i64,
    pub density_tritanium: i64,
    pub density_duranium: i64,
    pub density_molybdenum: i64,
    pub colonist_tax: i64,
    pub native_tax: i64,
    pub colonist_happiness: i64,
    pub native_happiness: i64,
    pub native_government: i64,
    pub native_clans: i64,
    pub native_type: i64,
    /// Raw temperature, `None` if unknown.
    pub temperature: Option<i64>,
    pub building_starbase: bool,
}

impl Planet {
    pub fn from_value(v: &Value, races: &RaceMap) -> Self {
        let owner = int(v, "ownerid");
        Self {
            id: int(v, "id"),
            owner,
            race: races.race_of(owner),
            name: text(v, "name"),
            x: int(v, "x"),
            y: int(v, "y"),
            friendly_code: text(v, "friendlycode"),
            mines: int(v, "mines"),
            factories: int(v, "factories"),
            defense: int(v, "defense"),
            neutronium: int(v, "neutronium"),
            tritanium: int(v, "tritanium"),
            duranium: int(v, "duranium"),
            molybdenum: int(v, "molybdenum"),
            clans: int(v, "clans"),
            supplies: int(v, "supplies"),
            megacredits: int(v, "megacredits"),
            ground_neutronium: int(v, "groundneutronium"),
            ground_tritanium: int(v, "groundtritanium"),
            ground_duranium: int(v, "groundduranium"),
            ground_molybdenum: int(v, "groundmolybdenum"),
            density_neutronium: int(v, "densityneutronium"),
            density_tritanium: int(v, "densitytritanium"),
            density_duranium: int(v, "densityduranium"),
            density_molybdenum: int(v, "densitymolybdenum"),
            colonist_tax: int(v, "colonisttaxrate"),
            native_tax: int(v, "nativetaxrate"),
            colonist_happiness: int(v, "colonisthappypoints"),
            native_happiness: int(v, "nativehappypoints"),
            native_government: int(v, "nativegovernment"),
            native_clans: int(v, "nativeclans"),
            native_type: int(v, "nativetype"),
            temperature: opt(v, "temp").filter(|&t| t >= 0),
            building_starbase: flag(v, "buildingstarbase"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Starbase {
    pub id: i64,
    pub planet_id: i64,
    pub defense: i64,
    pub damage: i64,
    pub engine_tech: i64,
    pub hull_tech: i64,
    pub beam_tech: i64,
    pub torpedo_tech: i64,
    pub fighters: i64,
    pub target_ship: i64,
    pub ship_mission: i64,
    pub mission: i64,
    pub build_hull: i64,
    pub build_engine: i64,
    pub build_beam: i64,
    pub build_beam_count: i64,
    pub build_torpedo: i64,
    pub build_torpedo_count: i64,
    pub is_building: bool,
}

impl Starbase {
    pub fn from_value(v: &Value) -> Self {
        Self {
            id: int(v, "id"),
            planet_id: int(v, "planetid"),
            defense: int(v, "defense"),
            damage: int(v, "damage"),
            engine_tech: int(v, "enginetechlevel"),
            hull_tech: int(v, "hulltechlevel"),
            beam_tech: int(v, "beamtechlevel"),
            torpedo_tech: int(v, "torptechlevel"),
            fighters: int(v, "fighters"),
            target_ship: int(v, "targetshipid"),
            ship_mission: int(v, "shipmission"),
            mission: int(v, "mission"),
            build_hull: int(v, "buildhullid"),
            build_engine: int(v, "buildengineid"),
            build_beam: int(v, "buildbeamid"),
            build_beam_count: int(v, "buildbeamcount"),
            build_torpedo: int(v, "buildtorpedoid"),
            build_torpedo_count: int(v, "buildtorpcount"),
            is_building: flag(v, "isbuilding"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockEntry {
    pub starbase_id: i64,
    pub stock_type: i64,
    pub stock_id: i64,
    pub amount: i64,
}

impl StockEntry {
    pub const HULL: i64 = 1;
    pub const ENGINE: i64 = 2;
    pub const BEAM: i64 = 3;
    pub const LAUNCHER: i64 = 4;
    pub const TORPEDO: i64 = 5;

    pub fn from_value(v: &Value) -> Self {
        Self {
            starbase_id: int(v, "starbaseid"),
            stock_type: int(v, "stocktype"),
            stock_id: int(v, "stockid"),
            amount: int(v, "amount"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Combatant {
    pub name: Vec<u8>,
    pub object_id: i64,
    pub owner: i64,
    pub race: i64,
    pub damage: i64,
    pub crew: i64,
    pub hull: i64,
    pub beam: i64,
    pub beam_count: i64,
    pub bays: i64,
    pub torpedo: i64,
    pub torpedoes: i64,
    pub fighters: i64,
    pub launchers: i64,
    pub shield: i64,
    pub mass: i64,
}

impl Combatant {
    fn from_value(v: &Value, owner: Option<i64>, races: &RaceMap) -> Self {
        let owner = owner.or_else(|| opt(v, "ownerid")).unwrap_or(0);
        let race = match races.race_of(owner) {
            0 => int(v, "raceid"),
            race => race,
        };
        Self {
            name: text(v, "name"),
            object_id: int(v, "objectid"),
            owner,
            race,
            damage: int(v, "damage"),
            crew: int(v, "crew"),
            hull: int(v, "hullid"),
            beam: int(v, "beamid"),
            beam_count: int(v, "beamcount"),
            bays: int(v, "baycount"),
            torpedo: int(v, "torpedoid"),
            torpedoes: int(v, "torpedos"),
            fighters: int(v, "fighters"),
            launchers: int(v, "launchercount"),
            shield: int(v, "shield"),
            mass: int(v, "mass"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Combat {
    pub id: i64,
    pub seed: i64,
    pub temperature: i64,
    pub battle_type: i64,
    pub left: Combatant,
    pub right: Combatant,
}

impl Combat {
    pub fn from_value(v: &Value, races: &RaceMap) -> Self {
        let empty = Value::Null;
        let left = v.get("left").unwrap_or(&empty);
        let right = v.get("right").unwrap_or(&empty);
        Self {
            id: int(v, "id"),
            seed: int(v, "seed"),
            temperature: opt(v, "temperature")
                .or_else(|| opt(right, "temperature"))
                .unwrap_or(0),
            battle_type: int(v, "battletype"),
            left: Combatant::from_value(left, opt(v, "leftownerid"), races),
            right: Combatant::from_value(right, opt(v, "rightownerid"), races),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub message_type: i64,
    pub headline: Vec<u8>,
    pub body: Vec<u8>,
    pub target: Option<i64>,
    pub x: Option<i64>,
    pub y: Option<i64>,
}

impl Message {
    pub fn from_value(v: &Value) -> Self {
        Self {
            id: int(v, "id"),
            message_type: int(v, "messagetype"),
            headline: text(v, "headline"),
            body: text(v, "body"),
            target: opt(v, "target"),
            x: opt(v, "x"),
            y: opt(v, "y"),
        }
    }

    pub fn coordinates(&self) -> Option<(i64, i64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x > 0 || y > 0 => Some((x, y)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreEntry {
    pub owner: i64,
    pub race: i64,
    pub turn: i64,
    pub planets: i64,
    pub capital_ships: i64,
    pub freighters: i64,
    pub starbases: i64,
    pub military: Option<i64>,
    pub inventory: Option<i64>,
    pub priority_points: Option<i64>,
}

impl ScoreEntry {
    pub fn from_value(v: &Value, races: &RaceMap) -> Self {
        let owner = int(v, "ownerid");
        Self {
            owner,
            race: races.race_of(owner),
            turn: int(v, "turn"),
            planets: int(v, "planets"),
            capital_ships: int(v, "capitalships"),
            freighters: int(v, "freighters"),
            starbases: int(v, "starbases"),
            military: opt(v, "militaryscore"),
            inventory: opt(v, "inventoryscore"),
            priority_points: opt(v, "prioritypoints"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IonStorm {
    pub id: i64,
    pub x: i64,
    pub y: i64,
    pub radius: i64,
    pub voltage: i64,
    pub warp: i64,
    pub heading: i64,
    pub growing: bool,
}

impl IonStorm {
    pub fn from_value(v: &Value) -> Self {
        Self {
            id: int(v, "id"),
            x: int(v, "x"),
            y: int(v, "y"),
            radius: int(v, "radius"),
            voltage: int(v, "voltage"),
            warp: int(v, "warp"),
            heading: int(v, "heading"),
            growing: flag(v, "isgrowing"),
        }
    }

    /// Storm class 1..=5 by voltage.
    pub fn class(&self) -> i64 {
        (self.voltage / 50 + 1).clamp(1, 5)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Minefield {
    pub id: i64,
    pub owner: i64,
    pub race: i64,
    pub x: i64,
    pub y: i64,
    pub radius: i64,
    pub units: i64,
    pub is_web: bool,
    pub info_turn: i64,
}

impl Minefield {
    pub fn from_value(v: &Value, races: &RaceMap) -> Self {
        let owner = int(v, "ownerid");
        Self {
            id: int(v, "id"),
            owner,
            race: races.race_of(owner),
            x: int(v, "x"),
            y: int(v, "y"),
            radius: int(v, "radius"),
            units: int(v, "units"),
            is_web: flag(v, "isweb"),
            info_turn: int(v, "infoturn"),
        }
    }
}
