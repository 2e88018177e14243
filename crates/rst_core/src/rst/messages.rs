//! Inbox rendering: real messages from the document plus messages built
//! from the game settings, all stored in the result file's obfuscated form.

use std::io;

use crate::document::Value;
use crate::game::Message;
use crate::writer::encode_to_vec;

const LINE_BREAK_SENTINEL: u8 = 26;
const SHIFT: u8 = 13;

/// Prefix letter, title, and whether the message target goes in the number.
struct Header {
    kind: char,
    title: &'static str,
    numbered: bool,
}

const fn header(kind: char, title: &'static str, numbered: bool) -> Header {
    Header {
        kind,
        title,
        numbered,
    }
}

const SUBSPACE: Header = header('r', "Sub Space Message", false);

/// Indexed by the document's message type.
const HEADERS: [Header; 22] = [
    header('r', "Sub Space Message", false),
    header('h', "HOST", false),
    header('p', "Terraforming", true),
    header('l', "Mine Laying", true),
    header('m', "Mine Sweep", true),
    header('p', "Planet", true),
    header('c', "Combat", true),
    header('s', "Fleet", true),
    header('s', "Ship", true),
    header('e', "Enemy Distress", true),
    header('x', "Explosion", true),
    header('d', "Starbase", true),
    header('w', "Web Mines", true),
    header('y', "Meteor", true),
    header('z', "Sensor Sweep", true),
    header('z', "Bio Scan", true),
    header('e', "Distress Call", true),
    header('r', "Sub Space Message", false),
    header('r', "Diplomacy", false),
    header('m', "Mine Scan", true),
    header('9', "Dark Sense", true),
    header('9', "Hiss", true),
];

pub fn message_header(message_type: i64, target: Option<i64>) -> String {
    let h = usize::try_from(message_type)
        .ok()
        .and_then(|idx| HEADERS.get(idx))
        .unwrap_or(&SUBSPACE);
    let number = if h.numbered {
        target.unwrap_or(0).clamp(0, 9999)
    } else {
        0
    };
    format!("(-{}{number:04})<<< {} >>>", h.kind, h.title)
}

const ENTITIES: [(&[u8], u8); 7] = [
    (b"&amp;", b'&'),
    (b"&lt;", b'<'),
    (b"&gt;", b'>'),
    (b"&quot;", b'"'),
    (b"&#39;", b'\''),
    (b"&apos;", b'\''),
    (b"&nbsp;", b' '),
];

fn is_line_break_tag(tag: &[u8]) -> bool {
    let name: Vec<u8> = tag
        .iter()
        .take_while(|b| !b.is_ascii_whitespace() && **b != b'/')
        .map(u8::to_ascii_lowercase)
        .collect();
    name == b"br"
}

/// Turn the service's HTML-ish body into plain text: `<br>` becomes a line
/// break, other tags vanish, common entities are decoded. Carriage returns
/// are dropped, since `\r` would encrypt to the line break sentinel.
pub fn strip_markup(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'<' => {
                let Some(len) = body[i + 1..].iter().position(|&b| b == b'>') else {
                    out.extend_from_slice(&body[i..]);
                    break;
                };
                if is_line_break_tag(&body[i + 1..i + 1 + len]) {
                    out.push(b'\n');
                }
                i += len + 2;
            }
            b'&' => {
                let rest = &body[i..];
                match ENTITIES.iter().find(|(name, _)| rest.starts_with(name)) {
                    Some((name, ch)) => {
                        out.push(*ch);
                        i += name.len();
                    }
                    None => {
                        out.push(b'&');
                        i += 1;
                    }
                }
            }
            b'\r' => i += 1,
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

pub fn render_message(message: &Message) -> Vec<u8> {
    let mut out = message_header(message.message_type, message.target).into_bytes();
    out.extend_from_slice(b"\n\nFrom: ");
    out.extend(message.headline.iter().filter(|&&b| b != b'\r'));
    out.extend_from_slice(b"\n\n");
    let body = strip_markup(&message.body);
    out.extend_from_slice(&body);

    if let Some((x, y)) = message.coordinates() {
        let spaced = format!("({x}, {y})");
        let tight = format!("({x},{y})");
        if !contains(&body, spaced.as_bytes()) && !contains(&body, tight.as_bytes()) {
            out.extend_from_slice(format!("\n\nLocation: {spaced}").as_bytes());
        }
    }
    out
}

fn scalar_text(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Null | Value::List(_) | Value::Mapping(_) => None,
        Value::Bool(true) => Some(b"Yes".to_vec()),
        Value::Bool(false) => Some(b"No".to_vec()),
        Value::String(bytes) => Some(bytes.clone()),
        number => Some(number.to_string().into_bytes()),
    }
}

/// Build one message out of `fields`, skipping absent ones. `None` when no
/// field was present at all.
fn synthesize(
    header: &str,
    source: &Value,
    fields: &[(&str, &str)],
    separator: &str,
    render: impl Fn(&Value) -> Option<Vec<u8>>,
) -> Option<Vec<u8>> {
    let mut lines = Vec::new();
    for (key, label) in fields {
        let Some(text) = source.get(key).and_then(&render) else {
            continue;
        };
        let mut line = format!("{label}{separator}").into_bytes();
        line.extend_from_slice(&text);
        lines.push(line);
    }
    if lines.is_empty() {
        return None;
    }
    let mut out = format!("{header}\n\n").into_bytes();
    out.extend_from_slice(&lines.join(&b'\n'));
    Some(out)
}

const GAME_SETTINGS: [(&str, &str); 12] = [
    ("name", "Game"),
    ("turn", "Turn"),
    ("hostcompleted", "Host completed"),
    ("nexthost", "Next host"),
    ("hoststart", "Host start"),
    ("victorycountdown", "Victory countdown"),
    ("maxallies", "Maximum allies"),
    ("mapwidth", "Map width"),
    ("mapheight", "Map height"),
    ("numplanets", "Planets"),
    ("shiplimit", "Ship limit"),
    ("endturn", "End turn"),
];

const HOST_SCALARS: [(&str, &str); 12] = [
    ("shipscanrange", "ScanRange"),
    ("planetscanrange", "SensorRange"),
    ("cloakfail", "CloakFailureRate"),
    ("structuredecayrate", "StructureDecayPerTurn"),
    ("maxions", "MaximumIonStorms"),
    ("nominefields", "NoMinefields"),
    ("nowebs", "NoWebMines"),
    ("unlimitedfuel", "UnlimitedFuel"),
    ("unlimitedammo", "UnlimitedAmmo"),
    ("fascistdoublebeams", "FascistDoubleBeams"),
    ("starbasefightertransfer", "AllowBaseFighterTransfer"),
    ("quantumtorpedos", "QuantumTorpedoes"),
];

const RACE_ARRAYS: [(&str, &str); 6] = [
    ("miningrate", "RaceMiningRate"),
    ("taxrate", "ColonistTaxRate"),
    ("groundattack", "GroundKillFactor"),
    ("grounddefense", "GroundDefenseFactor"),
    ("freefighters", "FreeFighters"),
    ("productionrate", "ProductionRate"),
];

fn race_array_text(value: &Value) -> Option<Vec<u8>> {
    let items = value.as_list()?;
    let cells: Vec<String> = items
        .iter()
        .map(|v| v.as_i64().map_or_else(|| String::from("?"), |n| n.to_string()))
        .collect();
    Some(cells.join(",").into_bytes())
}

/// Messages made from the settings mapping: game settings, host scalars,
/// and per-race arrays, in that order. Empty groups produce nothing.
pub fn synthesized_messages(settings: Option<&Value>) -> Vec<Vec<u8>> {
    let Some(settings) = settings else {
        return Vec::new();
    };
    [
        synthesize(
            "(-h0000)<<< Game Settings >>>",
            settings,
            &GAME_SETTINGS,
            ": ",
            scalar_text,
        ),
        synthesize(
            "(-h0000)<<< Host Configuration >>>",
            settings,
            &HOST_SCALARS,
            " = ",
            scalar_text,
        ),
        synthesize(
            "(-h0000)<<< Race Configuration >>>",
            settings,
            &RACE_ARRAYS,
            " = ",
            race_array_text,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// All inbox texts in file order: real messages by descending id, then the
/// synthesized ones.
pub fn inbox(messages: &[Message], settings: Option<&Value>) -> Vec<Vec<u8>> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by(|a, b| b.id.cmp(&a.id));
    let mut texts: Vec<Vec<u8>> = sorted.into_iter().map(render_message).collect();
    texts.extend(synthesized_messages(settings));
    texts
}

pub fn encrypt(text: &[u8]) -> Vec<u8> {
    text.iter()
        .map(|&b| {
            if b == b'\n' {
                LINE_BREAK_SENTINEL
            } else {
                b.wrapping_add(SHIFT)
            }
        })
        .collect()
}

pub fn decrypt(data: &[u8]) -> Vec<u8> {
    data.iter()
        .map(|&b| {
            if b == LINE_BREAK_SENTINEL {
                b'\n'
            } else {
                b.wrapping_sub(SHIFT)
            }
        })
        .collect()
}

/// Message section: count, then (1-based address, length) per message,
/// then the encrypted bodies. `start_offset` is the 1-based file position
/// of the section's first byte.
pub fn encode_messages(texts: &[Vec<u8>], start_offset: u32) -> io::Result<Vec<u8>> {
    let bodies: Vec<Vec<u8>> = texts.iter().map(|t| encrypt(t)).collect();
    let directory_len = 2 + bodies.len() * 6;
    encode_to_vec(|w| {
        w.write_word(bodies.len() as i64)?;
        let mut address = start_offset as usize + directory_len;
        for body in &bodies {
            w.write_u32(address as u32)?;
            w.write_word(body.len() as i64)?;
            address += body.len();
        }
        for body in &bodies {
            w.write_bytes(body)?;
        }
        Ok(())
    })
}
