//! Knowledge entries as reported by the host's world-info activation event.
//!
//! The host hands entries over as loosely-typed JSON: enum fields arrive as
//! numbers (sometimes as numeric strings), optional fields are often `null`,
//! and older lorebooks omit fields entirely. Deserialization is lenient so a
//! single odd entry never costs the rest of the batch.

use crate::message::Role;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Default insertion depth the host uses when an entry does not set one.
pub const DEFAULT_DEPTH: i64 = 4;

/// Default insertion order the host assigns to new entries.
pub const DEFAULT_ORDER: i64 = 100;

/// Where the host inserts an entry's content in the assembled prompt.
///
/// Discriminants follow the host's numeric encoding. Values the host may add
/// later are preserved in [`Position::Unknown`] instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Position {
    /// Before the character definition (0)
    BeforeCharacter,
    /// After the character definition (1)
    AfterCharacter,
    /// Top of the author's note (2)
    AuthorNoteTop,
    /// Bottom of the author's note (3)
    AuthorNoteBottom,
    /// Inside the chat history at a given depth (4)
    #[default]
    AtDepth,
    /// Top of the example messages (5)
    ExampleTop,
    /// Bottom of the example messages (6)
    ExampleBottom,
    /// A named outlet referenced from a prompt template (7)
    Outlet,
    /// Anything else the host sent
    Unknown(i64),
}

impl Position {
    /// Every known position, in host encoding order.
    pub const KNOWN: [Position; 8] = [
        Position::BeforeCharacter,
        Position::AfterCharacter,
        Position::AuthorNoteTop,
        Position::AuthorNoteBottom,
        Position::AtDepth,
        Position::ExampleTop,
        Position::ExampleBottom,
        Position::Outlet,
    ];

    /// Whether entries at this position are placed by depth in the chat.
    pub fn is_depth(&self) -> bool {
        matches!(self, Position::AtDepth)
    }

    /// The host's numeric encoding.
    pub fn code(&self) -> i64 {
        i64::from(*self)
    }
}

impl From<i64> for Position {
    fn from(code: i64) -> Self {
        match code {
            0 => Position::BeforeCharacter,
            1 => Position::AfterCharacter,
            2 => Position::AuthorNoteTop,
            3 => Position::AuthorNoteBottom,
            4 => Position::AtDepth,
            5 => Position::ExampleTop,
            6 => Position::ExampleBottom,
            7 => Position::Outlet,
            other => Position::Unknown(other),
        }
    }
}

impl From<Position> for i64 {
    fn from(p: Position) -> Self {
        match p {
            Position::BeforeCharacter => 0,
            Position::AfterCharacter => 1,
            Position::AuthorNoteTop => 2,
            Position::AuthorNoteBottom => 3,
            Position::AtDepth => 4,
            Position::ExampleTop => 5,
            Position::ExampleBottom => 6,
            Position::Outlet => 7,
            Position::Unknown(code) => code,
        }
    }
}

/// How secondary keys combine with a primary keyword match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SelectiveLogic {
    /// Primary match and any secondary key (0)
    #[default]
    AndAny,
    /// Primary match and not all secondary keys (1)
    NotAll,
    /// Primary match and none of the secondary keys (2)
    NotAny,
    /// Primary match and every secondary key (3)
    AndAll,
    Unknown(i64),
}

impl From<i64> for SelectiveLogic {
    fn from(code: i64) -> Self {
        match code {
            0 => SelectiveLogic::AndAny,
            1 => SelectiveLogic::NotAll,
            2 => SelectiveLogic::NotAny,
            3 => SelectiveLogic::AndAll,
            other => SelectiveLogic::Unknown(other),
        }
    }
}

impl From<SelectiveLogic> for i64 {
    fn from(l: SelectiveLogic) -> Self {
        match l {
            SelectiveLogic::AndAny => 0,
            SelectiveLogic::NotAll => 1,
            SelectiveLogic::NotAny => 2,
            SelectiveLogic::AndAll => 3,
            SelectiveLogic::Unknown(code) => code,
        }
    }
}

/// One triggered knowledge entry, exactly as the host reported it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawEntry {
    /// Name of the lorebook the entry belongs to.
    #[serde(default, deserialize_with = "nullable_name")]
    pub world: Option<String>,

    /// Identifier, unique within `world`.
    #[serde(default, deserialize_with = "lenient_uid")]
    pub uid: i64,

    /// Optional human label ("memo" in the host UI).
    #[serde(default, deserialize_with = "nullable_name")]
    pub comment: Option<String>,

    /// Text injected into the prompt.
    #[serde(default, deserialize_with = "nullable_string")]
    pub content: String,

    /// Primary trigger keys.
    #[serde(default, deserialize_with = "lenient_keys")]
    pub key: Vec<String>,

    /// Secondary trigger keys (optional filter).
    #[serde(default, rename = "keysecondary", deserialize_with = "lenient_keys")]
    pub key_secondary: Vec<String>,

    #[serde(default, rename = "selectiveLogic", deserialize_with = "lenient_logic")]
    pub selective_logic: SelectiveLogic,

    #[serde(default, deserialize_with = "lenient_position")]
    pub position: Position,

    /// Insertion depth. Only meaningful for [`Position::AtDepth`].
    #[serde(default, deserialize_with = "lenient_code")]
    pub depth: Option<i64>,

    /// Role the at-depth injection is written as.
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,

    /// Always active regardless of keyword matches.
    #[serde(default, deserialize_with = "nullable_bool")]
    pub constant: bool,

    /// Activated by vector similarity instead of keywords.
    #[serde(default, deserialize_with = "nullable_bool")]
    pub vectorized: bool,

    /// Insertion order; lower values are inserted first.
    #[serde(default, deserialize_with = "lenient_code")]
    pub order: Option<i64>,
}

impl RawEntry {
    /// Start an entry for the given lorebook and uid; handy for hosts and tests.
    pub fn new(world: impl Into<String>, uid: i64) -> Self {
        Self {
            world: Some(world.into()),
            uid,
            ..Self::default()
        }
    }

    /// The lorebook name, if the host supplied a non-empty one.
    pub fn world_name(&self) -> Option<&str> {
        self.world.as_deref().filter(|w| !w.trim().is_empty())
    }

    /// Label shown for the entry: its comment, or `Entry #<uid>`.
    pub fn display_name(&self) -> String {
        match self.comment.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => format!("Entry #{}", self.uid),
        }
    }
}

// ── Lenient field decoding ────────────────────────────────────────────────

fn code_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(code_from_value))
}

fn lenient_uid<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_code(deserializer)?.unwrap_or_default())
}

fn lenient_position<'de, D>(deserializer: D) -> Result<Position, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_code(deserializer)?
        .map(Position::from)
        .unwrap_or_default())
}

fn lenient_logic<'de, D>(deserializer: D) -> Result<SelectiveLogic, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_code(deserializer)?
        .map(SelectiveLogic::from)
        .unwrap_or_default())
}

/// Accepts the host's numeric role encoding (0 system, 1 user, 2 assistant)
/// as well as role names.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let role = match value {
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "system" | "0" => Some(Role::System),
            "user" | "1" => Some(Role::User),
            "assistant" | "2" => Some(Role::Assistant),
            _ => None,
        },
        Some(v) => match code_from_value(&v) {
            Some(0) => Some(Role::System),
            Some(1) => Some(Role::User),
            Some(2) => Some(Role::Assistant),
            _ => None,
        },
        None => None,
    };
    Ok(role)
}

/// Keys arrive as an array, but a lone string or number is taken as a single
/// key. Anything else decodes as no keys.
fn lenient_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => Vec::new(),
    })
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

fn nullable_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts booleans, 0/1 and their string forms. Anything else is `false`.
fn nullable_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        _ => false,
    })
}

/// Decode an activation batch one entry at a time. Elements that are not
/// entry objects are logged and skipped; the rest of the batch is kept.
pub fn decode_batch(value: Value) -> Vec<RawEntry> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        other => {
            warn!(kind = value_kind(&other), "Activation payload is not a list of entries");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if !item.is_object() {
                warn!(index, kind = value_kind(&item), "Skipping activated entry that is not an object");
                return None;
            }
            match serde_json::from_value::<RawEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable activated entry");
                    None
                }
            }
        })
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `deserialize_with` helper for fields holding a whole activation batch.
pub fn lenient_batch<'de, D>(deserializer: D) -> Result<Vec<RawEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(decode_batch(Value::deserialize(deserializer)?))
}
