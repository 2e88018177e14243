//! Ship-list baseline files: component specs, planet coordinates and names,
//! the per-race hull roster, and hull abilities.

use std::fmt::Write as _;

use crate::document::{Number, Value};
use crate::spec_table::{FieldDef, SpecTable, TableLayout, dword, text, word};

pub const RACE_COUNT: usize = 11;
pub const HULLS_PER_RACE: usize = 20;

pub static BEAMSPEC: TableLayout = TableLayout {
    file_name: "beamspec.dat",
    record_count: 10,
    fields: &[
        text("name", 20),
        word("cost"),
        word("tritanium"),
        word("duranium"),
        word("molybdenum"),
        word("mass"),
        word("techlevel"),
        word("crewkill"),
        word("damage"),
    ],
    patchable: &[
        "name",
        "cost",
        "tritanium",
        "duranium",
        "molybdenum",
        "mass",
        "techlevel",
        "crewkill",
        "damage",
    ],
};

pub static TORPSPEC: TableLayout = TableLayout {
    file_name: "torpspec.dat",
    record_count: 10,
    fields: &[
        text("name", 20),
        word("torpedocost"),
        word("launchercost"),
        word("tritanium"),
        word("duranium"),
        word("molybdenum"),
        word("mass"),
        word("techlevel"),
        word("crewkill"),
        word("damage"),
    ],
    patchable: &[
        "name",
        "torpedocost",
        "launchercost",
        "tritanium",
        "duranium",
        "molybdenum",
        "mass",
        "techlevel",
        "crewkill",
        "damage",
    ],
};

pub static ENGSPEC: TableLayout = TableLayout {
    file_name: "engspec.dat",
    record_count: 9,
    fields: &[
        text("name", 20),
        word("cost"),
        word("tritanium"),
        word("duranium"),
        word("molybdenum"),
        word("techlevel"),
        dword("warp1"),
        dword("warp2"),
        dword("warp3"),
        dword("warp4"),
        dword("warp5"),
        dword("warp6"),
        dword("warp7"),
        dword("warp8"),
        dword("warp9"),
    ],
    patchable: &[
        "name",
        "cost",
        "tritanium",
        "duranium",
        "molybdenum",
        "techlevel",
        "warp1",
        "warp2",
        "warp3",
        "warp4",
        "warp5",
        "warp6",
        "warp7",
        "warp8",
        "warp9",
    ],
};

/// `picture` and `zero` have no counterpart in the document and are only
/// ever carried over from the baseline file.
pub static HULLSPEC: TableLayout = TableLayout {
    file_name: "hullspec.dat",
    record_count: 105,
    fields: &[
        text("name", 30),
        word("picture"),
        word("zero"),
        word("tritanium"),
        word("duranium"),
        word("molybdenum"),
        word("fueltank"),
        word("crew"),
        word("engines"),
        word("mass"),
        word("techlevel"),
        word("cargo"),
        word("fighterbays"),
        word("launchers"),
        word("beams"),
        word("cost"),
    ],
    patchable: &[
        "name",
        "tritanium",
        "duranium",
        "molybdenum",
        "fueltank",
        "crew",
        "engines",
        "mass",
        "techlevel",
        "cargo",
        "fighterbays",
        "launchers",
        "beams",
        "cost",
    ],
};

pub static XYPLAN: TableLayout = TableLayout {
    file_name: "xyplan.dat",
    record_count: 500,
    fields: &[word("x"), word("y"), word("unused")],
    patchable: &["x", "y"],
};

pub static PLANET_NAMES: TableLayout = TableLayout {
    file_name: "planet.nm",
    record_count: 500,
    fields: &[text("name", 20)],
    patchable: &["name"],
};

const TRUEHULL_FIELDS: [FieldDef; HULLS_PER_RACE] = [
    word("slot1"),
    word("slot2"),
    word("slot3"),
    word("slot4"),
    word("slot5"),
    word("slot6"),
    word("slot7"),
    word("slot8"),
    word("slot9"),
    word("slot10"),
    word("slot11"),
    word("slot12"),
    word("slot13"),
    word("slot14"),
    word("slot15"),
    word("slot16"),
    word("slot17"),
    word("slot18"),
    word("slot19"),
    word("slot20"),
];

/// One record per race, one column per build slot. Never patched through
/// the generic row merge; see [`merge_truehull`].
pub static TRUEHULL: TableLayout = TableLayout {
    file_name: "truehull.dat",
    record_count: RACE_COUNT,
    fields: &TRUEHULL_FIELDS,
    patchable: &[],
};

pub const HULLFUNC_FILE: &str = "hullfunc.txt";

/// Copy the current race's hull roster into its truehull row, zero-padding
/// short lists. Other races' rows are left as loaded.
pub fn merge_truehull(table: &mut SpecTable, race_hulls: &[i64], race: usize) {
    for (slot, field) in TRUEHULL_FIELDS.iter().enumerate() {
        let hull = race_hulls.get(slot).copied().unwrap_or(0);
        table.set_cell(race, field.name, &Value::Number(Number::Int(hull)));
    }
}

/// Hull id in build slot `slot` (1-based) of a race's truehull row.
pub fn truehull_slot(table: &SpecTable, race: usize, slot: usize) -> Option<u16> {
    let field = TRUEHULL_FIELDS.get(slot.checked_sub(1)?)?;
    table.get_u16(race, field.name)
}

/// Hull-function assignments: nobody may cloak, then one grant per hull the
/// document marks as cloak-capable. Only the plain cloak is derived.
pub fn hull_ability_rules(hulls: &[Value]) -> String {
    let mut out = String::new();
    out.push_str("%hullfunc\n");
    out.push_str("Hull = *\nFunction = Cloak\nRacesAllowed = -\n");

    let mut cloakers: Vec<i64> = hulls
        .iter()
        .filter(|hull| hull.get("cancloak").and_then(Value::as_bool) == Some(true))
        .filter_map(|hull| hull.int("id"))
        .collect();
    cloakers.sort_unstable();
    cloakers.dedup();

    for id in cloakers {
        let _ = write!(out, "\nHull = {id}\nFunction = Cloak\nRacesAllowed = +\n");
    }
    out
}
