//! Typed view over the game document: who the current player is, how
//! internal owner ids map to race slots, and the entity collections.

pub mod records;

use std::collections::HashMap;

use crate::core_api::CoreError;
use crate::document::Value;
use crate::shiplist::RACE_COUNT;

pub use records::{
    Cargo, Combat, Combatant, IonStorm, Message, Minefield, Planet, ScoreEntry, Ship, Starbase,
    StockEntry, Transfer,
};

/// Internal owner id to race slot, built from the `players` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaceMap {
    by_owner: HashMap<i64, i64>,
}

impl RaceMap {
    pub fn from_players(players: &[Value]) -> Self {
        let by_owner = players
            .iter()
            .filter_map(|p| Some((p.int("id")?, p.int("raceid")?)))
            .collect();
        Self { by_owner }
    }

    /// Race slot of an owner; unowned and unknown owners map to 0.
    pub fn race_of(&self, owner: i64) -> i64 {
        if owner <= 0 {
            return 0;
        }
        self.by_owner.get(&owner).copied().unwrap_or(0)
    }

    pub fn insert(&mut self, owner: i64, race: i64) {
        self.by_owner.insert(owner, race);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    /// Internal player id used as `ownerid` throughout the document.
    pub player_id: i64,
    /// Race slot, 1..=11.
    pub race: i64,
    pub save_key: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct GameState<'a> {
    rst: &'a Value,
    pub player: PlayerIdentity,
    pub races: RaceMap,
}

impl<'a> GameState<'a> {
    /// Accepts either the bare game state or the `{ "rst": ... }` envelope
    /// and validates the player identity.
    pub fn from_document(root: &'a Value) -> Result<Self, CoreError> {
        let rst = match root.get("rst") {
            Some(inner @ Value::Mapping(_)) => inner,
            _ => root,
        };
        if rst.as_mapping().is_none() {
            return Err(CoreError::schema("document root is not a mapping"));
        }

        let player = rst
            .get("player")
            .ok_or_else(|| CoreError::schema("document has no player record"))?;
        let player_id = player
            .int("id")
            .ok_or_else(|| CoreError::schema("player record has no id"))?;
        let race = player
            .int("raceid")
            .ok_or_else(|| CoreError::schema("player record has no raceid"))?;
        if !(1..=RACE_COUNT as i64).contains(&race) {
            return Err(CoreError::schema(format!(
                "player race {race} outside 1..={RACE_COUNT}"
            )));
        }

        let players = rst.list("players");
        if let Some(listed) = players
            .iter()
            .find(|p| p.int("id") == Some(player_id))
            .and_then(|p| p.int("raceid"))
            && listed != race
        {
            return Err(CoreError::schema(format!(
                "player {player_id} is race {race} in the player record but race {listed} in the player list"
            )));
        }

        let inner_key = player.bytes("savekey");
        let outer_key = if std::ptr::eq(rst, root) {
            None
        } else {
            root.bytes("savekey")
        };
        if let (Some(inner), Some(outer)) = (inner_key, outer_key)
            && inner != outer
        {
            return Err(CoreError::schema(
                "save key in the player record does not match the document save key",
            ));
        }

        let mut races = RaceMap::from_players(players);
        races.insert(player_id, race);

        Ok(Self {
            rst,
            player: PlayerIdentity {
                player_id,
                race,
                save_key: outer_key.or(inner_key).map(<[u8]>::to_vec),
            },
            races,
        })
    }

    pub fn collection(&self, key: &str) -> &'a [Value] {
        self.rst.list(key)
    }

    pub fn settings(&self) -> Option<&'a Value> {
        self.rst.get("settings")
    }

    pub fn turn(&self) -> i64 {
        self.settings()
            .and_then(|s| s.int("turn"))
            .or_else(|| self.rst.pointer("game.turn").and_then(Value::as_i64))
            .unwrap_or(0)
    }

    pub fn game_name(&self) -> Vec<u8> {
        self.rst
            .pointer("game.name")
            .or_else(|| self.settings().and_then(|s| s.get("name")))
            .and_then(Value::as_bytes)
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// Host completion time in the legacy `MM-DD-YYYYHH:MM:SS` form.
    pub fn timestamp(&self) -> [u8; 18] {
        let raw = self
            .settings()
            .and_then(|s| s.bytes("hostcompleted"))
            .unwrap_or_default();
        legacy_timestamp(raw)
    }

    pub fn race_hulls(&self) -> Vec<i64> {
        self.collection("racehulls")
            .iter()
            .filter_map(Value::as_i64)
            .collect()
    }

    pub fn ships(&self) -> Vec<Ship> {
        self.collection("ships")
            .iter()
            .map(|v| Ship::from_value(v, &self.races))
            .collect()
    }

    pub fn own_ships(&self) -> Vec<Ship> {
        let mut ships: Vec<Ship> = self
            .ships()
            .into_iter()
            .filter(|s| s.owner == self.player.player_id)
            .collect();
        ships.sort_by_key(|s| s.id);
        ships
    }

    pub fn foreign_ships(&self) -> Vec<Ship> {
        let mut ships: Vec<Ship> = self
            .ships()
            .into_iter()
            .filter(|s| s.owner != self.player.player_id)
            .collect();
        ships.sort_by_key(|s| s.id);
        ships
    }

    pub fn planets(&self) -> Vec<Planet> {
        self.collection("planets")
            .iter()
            .map(|v| Planet::from_value(v, &self.races))
            .collect()
    }

    pub fn starbases(&self) -> Vec<Starbase> {
        self.collection("starbases")
            .iter()
            .map(Starbase::from_value)
            .collect()
    }

    pub fn stock(&self) -> Vec<StockEntry> {
        self.collection("stock")
            .iter()
            .map(StockEntry::from_value)
            .collect()
    }

    pub fn combats(&self) -> Vec<Combat> {
        self.collection("vcrs")
            .iter()
            .map(|v| Combat::from_value(v, &self.races))
            .collect()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.collection("messages")
            .iter()
            .map(Message::from_value)
            .collect()
    }

    pub fn scores(&self) -> Vec<ScoreEntry> {
        self.collection("scores")
            .iter()
            .map(|v| ScoreEntry::from_value(v, &self.races))
            .collect()
    }

    pub fn ion_storms(&self) -> Vec<IonStorm> {
        self.collection("ionstorms")
            .iter()
            .map(IonStorm::from_value)
            .collect()
    }

    pub fn minefields(&self) -> Vec<Minefield> {
        self.collection("minefields")
            .iter()
            .map(|v| Minefield::from_value(v, &self.races))
            .collect()
    }

    /// Internal owner of the planet a starbase sits on, 0 if unknown.
    pub fn base_owner(&self, base: &Starbase, planets: &[Planet]) -> i64 {
        planets
            .iter()
            .find(|p| p.id == base.planet_id)
            .map_or(0, |p| p.owner)
    }
}

/// Convert `M/D/YYYY h:mm:ss AM` into `MM-DD-YYYYHH:MM:SS`. Anything that
/// does not look like that is copied verbatim, space padded.
pub fn legacy_timestamp(raw: &[u8]) -> [u8; 18] {
    let mut out = [b' '; 18];
    let text = String::from_utf8_lossy(raw);
    if let Some(formatted) = reformat_timestamp(text.trim()) {
        out.copy_from_slice(formatted.as_bytes());
    } else {
        let n = raw.len().min(18);
        out[..n].copy_from_slice(&raw[..n]);
    }
    out
}

fn reformat_timestamp(text: &str) -> Option<String> {
    let mut parts = text.split_whitespace();
    let date = parts.next()?;
    let time = parts.next()?;
    let meridiem = parts.next();

    let mut date_parts = date.split('/').map(str::parse::<u32>);
    let month = date_parts.next()?.ok()?;
    let day = date_parts.next()?.ok()?;
    let year = date_parts.next()?.ok()?;

    let mut time_parts = time.split(':').map(str::parse::<u32>);
    let mut hour = time_parts.next()?.ok()?;
    let minute = time_parts.next()?.ok()?;
    let second = time_parts.next().and_then(Result::ok).unwrap_or(0);

    match meridiem.map(str::to_ascii_uppercase).as_deref() {
        Some("PM") if hour < 12 => hour += 12,
        Some("AM") if hour == 12 => hour = 0,
        _ => {}
    }
    if month > 12 || day > 31 || year > 9999 || hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some(format!(
        "{month:02}-{day:02}-{year:04}{hour:02}:{minute:02}:{second:02}"
    ))
}
