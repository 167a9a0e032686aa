//! The settings document and the slices it is made of
//!
//! The document is kept as an order-preserving JSON object so that keys the
//! engine does not understand survive a read-modify-write untouched. Each
//! [`Slice`] knows where it lives inside the document and how to read,
//! check and write itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use tracing::warn;

use super::normalize::{
    normalize_dictionary, normalize_general, normalize_romaji_rows, normalize_shortcuts,
    normalize_symbol_width, normalize_width_groups, normalize_zenzai, overlay_general,
    overlay_shortcuts, overlay_symbol_width, overlay_width_groups, overlay_zenzai,
};
use super::schema::{
    CharacterWidthGroups, DictionaryEntry, GeneralConfig, RomajiRule, ShortcutConfig,
    SymbolWidthMap, ZenzaiConfig,
};
use super::validate::{
    parse_dictionary_input, parse_romaji_input, require_object, validate_dictionary,
    validate_romaji_rows, ValidationFailure,
};
use crate::constants::keys;

/// The whole settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument(Map<String, Value>);

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; only objects are documents
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Raw stored value of a slice, if present
    pub fn slice(&self, name: SliceName) -> Option<&Value> {
        let (container, key) = name.path();
        let top = self.0.get(container)?;
        match key {
            None => Some(top),
            Some(key) => top.as_object()?.get(key),
        }
    }

    /// Store a slice value at its path, leaving every other key in place
    pub fn put_slice(&mut self, name: SliceName, value: Value) {
        let (container, key) = name.path();
        let Some(key) = key else {
            self.0.insert(container.to_string(), value);
            return;
        };

        let entry = self
            .0
            .entry(container.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            warn!(container, "replacing non-object container");
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }
}

/// Every slice of the document the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceName {
    Shortcuts,
    General,
    Zenzai,
    SymbolWidth,
    WidthGroups,
    RomajiTable,
    UserDictionary,
}

impl SliceName {
    pub const ALL: [SliceName; 7] = [
        SliceName::Shortcuts,
        SliceName::General,
        SliceName::Zenzai,
        SliceName::SymbolWidth,
        SliceName::WidthGroups,
        SliceName::RomajiTable,
        SliceName::UserDictionary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SliceName::Shortcuts => "shortcuts",
            SliceName::General => "general",
            SliceName::Zenzai => "zenzai",
            SliceName::SymbolWidth => "symbol_width",
            SliceName::WidthGroups => "width_groups",
            SliceName::RomajiTable => "romaji_table",
            SliceName::UserDictionary => "user_dictionary",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slice| slice.as_str() == name)
    }

    /// Top-level key and, for nested slices, the key inside it
    pub fn path(self) -> (&'static str, Option<&'static str>) {
        match self {
            SliceName::Shortcuts => (keys::SHORTCUTS, None),
            SliceName::General => (keys::GENERAL, None),
            SliceName::Zenzai => (keys::ZENZAI, None),
            SliceName::SymbolWidth => (keys::CHARACTER_WIDTH, Some(keys::SYMBOL_FULLWIDTH)),
            SliceName::WidthGroups => (keys::CHARACTER_WIDTH, Some(keys::WIDTH_GROUPS)),
            SliceName::RomajiTable => (keys::ROMAJI_TABLE, Some(keys::ROMAJI_ROWS)),
            SliceName::UserDictionary => (keys::USER_DICTIONARY, Some(keys::DICTIONARY_ENTRIES)),
        }
    }

    /// Sequence slices are the only ones validation can reject
    pub fn is_sequence(self) -> bool {
        matches!(self, SliceName::RomajiTable | SliceName::UserDictionary)
    }
}

impl std::fmt::Display for SliceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SliceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|slice| slice.as_str()).collect();
            format!("unknown slice '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

/// A typed view of one slice
pub trait Slice: Send + 'static {
    const NAME: SliceName;

    type Value: Debug + Clone + PartialEq + Serialize + Send + Sync + 'static;

    /// Canonical value from whatever is stored (total)
    fn normalize(raw: Option<&Value>) -> Self::Value;

    /// Check an edited value and return the form to persist
    fn prepare(candidate: Self::Value) -> Result<Self::Value, Vec<ValidationFailure>> {
        Ok(candidate)
    }

    /// Apply caller-supplied JSON to the current canonical value
    fn apply_raw(current: Self::Value, raw: &Value) -> Result<Self::Value, Vec<ValidationFailure>>;

    fn read(document: &ConfigDocument) -> Self::Value {
        Self::normalize(document.slice(Self::NAME))
    }

    fn write(document: &mut ConfigDocument, value: &Self::Value) -> Result<(), serde_json::Error> {
        document.put_slice(Self::NAME, serde_json::to_value(value)?);
        Ok(())
    }
}

pub struct Shortcuts;
pub struct General;
pub struct Zenzai;
pub struct SymbolWidth;
pub struct WidthGroups;
pub struct RomajiTable;
pub struct UserDictionary;

impl Slice for Shortcuts {
    const NAME: SliceName = SliceName::Shortcuts;
    type Value = ShortcutConfig;

    fn normalize(raw: Option<&Value>) -> ShortcutConfig {
        normalize_shortcuts(raw)
    }

    fn apply_raw(current: ShortcutConfig, raw: &Value) -> Result<ShortcutConfig, Vec<ValidationFailure>> {
        require_object(raw)?;
        Ok(overlay_shortcuts(current, Some(raw)))
    }
}

impl Slice for General {
    const NAME: SliceName = SliceName::General;
    type Value = GeneralConfig;

    fn normalize(raw: Option<&Value>) -> GeneralConfig {
        normalize_general(raw)
    }

    fn apply_raw(current: GeneralConfig, raw: &Value) -> Result<GeneralConfig, Vec<ValidationFailure>> {
        require_object(raw)?;
        Ok(overlay_general(current, Some(raw)))
    }
}

impl Slice for Zenzai {
    const NAME: SliceName = SliceName::Zenzai;
    type Value = ZenzaiConfig;

    fn normalize(raw: Option<&Value>) -> ZenzaiConfig {
        normalize_zenzai(raw)
    }

    fn apply_raw(current: ZenzaiConfig, raw: &Value) -> Result<ZenzaiConfig, Vec<ValidationFailure>> {
        require_object(raw)?;
        Ok(overlay_zenzai(current, Some(raw)))
    }
}

impl Slice for SymbolWidth {
    const NAME: SliceName = SliceName::SymbolWidth;
    type Value = SymbolWidthMap;

    fn normalize(raw: Option<&Value>) -> SymbolWidthMap {
        normalize_symbol_width(raw)
    }

    /// Typed edits can touch the inner map directly
    fn prepare(candidate: SymbolWidthMap) -> Result<SymbolWidthMap, Vec<ValidationFailure>> {
        Ok(candidate.canonical())
    }

    fn apply_raw(current: SymbolWidthMap, raw: &Value) -> Result<SymbolWidthMap, Vec<ValidationFailure>> {
        require_object(raw)?;
        Ok(overlay_symbol_width(current, Some(raw)))
    }
}

impl Slice for WidthGroups {
    const NAME: SliceName = SliceName::WidthGroups;
    type Value = CharacterWidthGroups;

    fn normalize(raw: Option<&Value>) -> CharacterWidthGroups {
        normalize_width_groups(raw)
    }

    fn apply_raw(
        current: CharacterWidthGroups,
        raw: &Value,
    ) -> Result<CharacterWidthGroups, Vec<ValidationFailure>> {
        require_object(raw)?;
        Ok(overlay_width_groups(current, Some(raw)))
    }
}

impl Slice for RomajiTable {
    const NAME: SliceName = SliceName::RomajiTable;
    type Value = Vec<RomajiRule>;

    fn normalize(raw: Option<&Value>) -> Vec<RomajiRule> {
        normalize_romaji_rows(raw)
    }

    fn prepare(candidate: Vec<RomajiRule>) -> Result<Vec<RomajiRule>, Vec<ValidationFailure>> {
        validate_romaji_rows(&candidate)
    }

    /// Raw input replaces the whole table
    fn apply_raw(_current: Vec<RomajiRule>, raw: &Value) -> Result<Vec<RomajiRule>, Vec<ValidationFailure>> {
        parse_romaji_input(raw)
    }
}

impl Slice for UserDictionary {
    const NAME: SliceName = SliceName::UserDictionary;
    type Value = Vec<DictionaryEntry>;

    fn normalize(raw: Option<&Value>) -> Vec<DictionaryEntry> {
        normalize_dictionary(raw)
    }

    fn prepare(candidate: Vec<DictionaryEntry>) -> Result<Vec<DictionaryEntry>, Vec<ValidationFailure>> {
        validate_dictionary(&candidate)
    }

    fn apply_raw(
        _current: Vec<DictionaryEntry>,
        raw: &Value,
    ) -> Result<Vec<DictionaryEntry>, Vec<ValidationFailure>> {
        parse_dictionary_input(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::WidthMode;
    use serde_json::json;

    fn document(value: Value) -> ConfigDocument {
        ConfigDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(ConfigDocument::from_value(json!([1, 2])).is_none());
        assert!(ConfigDocument::from_value(json!({})).is_some());
    }

    #[test]
    fn test_slice_lookup_nested() {
        let doc = document(json!({
            "character_width": { "groups": { "tilde": "half" } },
            "romaji_table": "garbage",
        }));
        assert_eq!(doc.slice(SliceName::WidthGroups), Some(&json!({ "tilde": "half" })));
        assert!(doc.slice(SliceName::SymbolWidth).is_none());
        assert!(doc.slice(SliceName::RomajiTable).is_none());
        assert!(doc.slice(SliceName::Shortcuts).is_none());
    }

    #[test]
    fn test_put_slice_keeps_siblings_and_order() {
        let mut doc = document(json!({
            "version": "0.1.0",
            "character_width": { "symbol_fullwidth": { "0": true }, "groups": {}, "future": 1 },
            "zenzai": { "enable": false },
        }));
        doc.put_slice(SliceName::WidthGroups, json!({ "tilde": "half" }));

        let keys: Vec<&String> = doc.as_map().keys().collect();
        assert_eq!(keys, ["version", "character_width", "zenzai"]);
        assert_eq!(
            doc.as_map()["character_width"],
            json!({ "symbol_fullwidth": { "0": true }, "groups": { "tilde": "half" }, "future": 1 })
        );
    }

    #[test]
    fn test_put_slice_creates_container() {
        let mut doc = ConfigDocument::new();
        doc.put_slice(SliceName::UserDictionary, json!([]));
        assert_eq!(doc.into_value(), json!({ "user_dictionary": { "entries": [] } }));
    }

    #[test]
    fn test_put_slice_replaces_non_object_container() {
        let mut doc = document(json!({ "romaji_table": 42 }));
        doc.put_slice(SliceName::RomajiTable, json!([]));
        assert_eq!(doc.as_map()["romaji_table"], json!({ "rows": [] }));
    }

    #[test]
    fn test_slice_names_round_trip() {
        for slice in SliceName::ALL {
            assert_eq!(slice.as_str().parse::<SliceName>(), Ok(slice));
        }
        assert!("nope".parse::<SliceName>().is_err());
    }

    #[test]
    fn test_typed_read_write() {
        let mut doc = ConfigDocument::new();
        let mut groups = WidthGroups::read(&doc);
        groups.tilde = WidthMode::Half;
        WidthGroups::write(&mut doc, &groups).unwrap();
        assert_eq!(WidthGroups::read(&doc), groups);
        assert_eq!(doc.as_map()["character_width"]["groups"]["tilde"], json!("half"));
    }

    #[test]
    fn test_apply_raw_patches_map_slices() {
        let current = CharacterWidthGroups::default();
        let patched = WidthGroups::apply_raw(current, &json!({ "quote": "half", "bogus": "full" })).unwrap();
        assert_eq!(patched.quote, WidthMode::Half);
        assert!(WidthGroups::apply_raw(patched, &json!("half")).is_err());
    }

    #[test]
    fn test_apply_raw_replaces_sequences() {
        let current = vec![DictionaryEntry::new("a", "b")];
        let replaced = UserDictionary::apply_raw(current, &json!([{ "reading": "c", "word": "d" }])).unwrap();
        assert_eq!(replaced, vec![DictionaryEntry::new("c", "d")]);
    }
}
