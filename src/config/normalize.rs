//! Slice normalization
//!
//! Every function here is total: whatever shape the stored value has, the
//! result is a fully defaulted, type-sound slice. Unknown keys and ill-typed
//! values are dropped, malformed sequence elements are skipped. Nothing is
//! reported back to the caller; drops are only logged.

use serde_json::{Map, Value};
use tracing::debug;

use super::document::SliceName;
use super::schema::{
    default_romaji_rows, CharacterWidthGroups, DictionaryEntry, GeneralConfig, NumpadInputMode,
    PunctuationStyle, RomajiRule, ShortcutConfig, SpaceInputMode, SymbolStyle, SymbolWidthMap,
    WidthGroup, WidthMode, ZenzaiBackend, ZenzaiConfig, CHARACTER_WIDTH_SYMBOL_DEFAULTS,
};

/// Normalize any slice by name, returning its canonical JSON form
pub fn normalize(slice: SliceName, raw: Option<&Value>) -> Value {
    let canonical = match slice {
        SliceName::Shortcuts => serde_json::to_value(normalize_shortcuts(raw)),
        SliceName::General => serde_json::to_value(normalize_general(raw)),
        SliceName::Zenzai => serde_json::to_value(normalize_zenzai(raw)),
        SliceName::SymbolWidth => serde_json::to_value(normalize_symbol_width(raw)),
        SliceName::WidthGroups => serde_json::to_value(normalize_width_groups(raw)),
        SliceName::RomajiTable => serde_json::to_value(normalize_romaji_rows(raw)),
        SliceName::UserDictionary => serde_json::to_value(normalize_dictionary(raw)),
    };
    // Plain structs of strings, bools and string maps always serialize
    canonical.unwrap_or(Value::Null)
}

fn as_object<'a>(slice: SliceName, raw: Option<&'a Value>) -> Option<&'a Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            debug!(slice = %slice, found = %kind(other), "slice is not an object, using defaults");
            None
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Overwrite `slot` with the bool at `key`, if it is one
fn overlay_bool(map: &Map<String, Value>, key: &str, slot: &mut bool) {
    match map.get(key) {
        Some(Value::Bool(value)) => *slot = *value,
        Some(other) => debug!(key, found = %kind(other), "ignoring non-bool value"),
        None => {}
    }
}

/// Overwrite `slot` with the enum member named at `key`, if it names one
fn overlay_enum<T>(map: &Map<String, Value>, key: &str, slot: &mut T, parse: impl Fn(&str) -> Option<T>) {
    match map.get(key) {
        Some(Value::String(text)) => match parse(text) {
            Some(value) => *slot = value,
            None => debug!(key, value = %text, "unrecognized enum value, keeping current"),
        },
        Some(other) => debug!(key, found = %kind(other), "ignoring non-string enum value"),
        None => {}
    }
}

pub fn overlay_shortcuts(mut base: ShortcutConfig, raw: Option<&Value>) -> ShortcutConfig {
    if let Some(map) = as_object(SliceName::Shortcuts, raw) {
        overlay_bool(map, "ctrl_space_toggle", &mut base.ctrl_space_toggle);
        overlay_bool(map, "alt_backquote_toggle", &mut base.alt_backquote_toggle);
    }
    base
}

pub fn normalize_shortcuts(raw: Option<&Value>) -> ShortcutConfig {
    overlay_shortcuts(ShortcutConfig::default(), raw)
}

pub fn overlay_general(mut base: GeneralConfig, raw: Option<&Value>) -> GeneralConfig {
    if let Some(map) = as_object(SliceName::General, raw) {
        overlay_enum(map, "punctuation_style", &mut base.punctuation_style, PunctuationStyle::parse);
        overlay_enum(map, "symbol_style", &mut base.symbol_style, SymbolStyle::parse);
        overlay_enum(map, "space_input", &mut base.space_input, |text| {
            SpaceInputMode::parse(text).or_else(|| {
                let migrated = SpaceInputMode::from_legacy(text);
                if let Some(value) = migrated {
                    debug!(legacy = %text, migrated = %value, "migrated legacy space_input value");
                }
                migrated
            })
        });
        overlay_enum(map, "numpad_input", &mut base.numpad_input, NumpadInputMode::parse);
    }
    base
}

pub fn normalize_general(raw: Option<&Value>) -> GeneralConfig {
    overlay_general(GeneralConfig::default(), raw)
}

pub fn overlay_zenzai(mut base: ZenzaiConfig, raw: Option<&Value>) -> ZenzaiConfig {
    if let Some(map) = as_object(SliceName::Zenzai, raw) {
        overlay_bool(map, "enable", &mut base.enable);
        match map.get("profile") {
            Some(Value::String(profile)) => base.profile = profile.clone(),
            Some(other) => debug!(found = %kind(other), "ignoring non-string zenzai profile"),
            None => {}
        }
        overlay_enum(map, "backend", &mut base.backend, ZenzaiBackend::parse);
    }
    base
}

pub fn normalize_zenzai(raw: Option<&Value>) -> ZenzaiConfig {
    overlay_zenzai(ZenzaiConfig::default(), raw)
}

pub fn overlay_symbol_width(mut base: SymbolWidthMap, raw: Option<&Value>) -> SymbolWidthMap {
    if let Some(map) = as_object(SliceName::SymbolWidth, raw) {
        for (symbol, _) in CHARACTER_WIDTH_SYMBOL_DEFAULTS {
            if let Some(slot) = base.0.get_mut(symbol) {
                overlay_bool(map, symbol, slot);
            }
        }
        let dropped = map
            .keys()
            .filter(|key| base.0.get(key.as_str()).is_none())
            .count();
        if dropped > 0 {
            debug!(dropped, "dropped unknown symbol width keys");
        }
    }
    base
}

pub fn normalize_symbol_width(raw: Option<&Value>) -> SymbolWidthMap {
    overlay_symbol_width(SymbolWidthMap::default(), raw)
}

pub fn overlay_width_groups(mut base: CharacterWidthGroups, raw: Option<&Value>) -> CharacterWidthGroups {
    if let Some(map) = as_object(SliceName::WidthGroups, raw) {
        for group in WidthGroup::ALL {
            let mut mode = base.get(group);
            overlay_enum(map, group.as_str(), &mut mode, WidthMode::parse);
            base.set(group, mode);
        }
    }
    base
}

pub fn normalize_width_groups(raw: Option<&Value>) -> CharacterWidthGroups {
    overlay_width_groups(CharacterWidthGroups::default(), raw)
}

/// Parse one romaji row; None if it is structurally malformed
pub fn parse_romaji_row(value: &Value) -> Option<RomajiRule> {
    let map = value.as_object()?;
    let input = map.get("input")?.as_str()?;
    let output = map.get("output")?.as_str()?;
    let next_input = match map.get("next_input") {
        None | Some(Value::Null) => "",
        Some(Value::String(next)) => next,
        Some(_) => return None,
    };
    Some(RomajiRule::new(input, output, next_input))
}

/// Parse one dictionary entry; None if it is structurally malformed
pub fn parse_dictionary_entry(value: &Value) -> Option<DictionaryEntry> {
    let map = value.as_object()?;
    let reading = map.get("reading")?.as_str()?;
    let word = map.get("word")?.as_str()?;
    Some(DictionaryEntry::new(reading, word))
}

fn filter_well_formed<T>(slice: SliceName, items: &[Value], parse: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    let parsed: Vec<T> = items.iter().filter_map(parse).collect();
    if parsed.len() != items.len() {
        debug!(slice = %slice, dropped = items.len() - parsed.len(), "dropped malformed rows");
    }
    parsed
}

/// An absent table means "never customized" and yields the bundled table
pub fn normalize_romaji_rows(raw: Option<&Value>) -> Vec<RomajiRule> {
    match raw {
        Some(Value::Array(items)) => filter_well_formed(SliceName::RomajiTable, items, parse_romaji_row),
        Some(Value::Null) | None => default_romaji_rows(),
        Some(other) => {
            debug!(found = %kind(other), "romaji rows are not an array, using defaults");
            default_romaji_rows()
        }
    }
}

pub fn normalize_dictionary(raw: Option<&Value>) -> Vec<DictionaryEntry> {
    match raw {
        Some(Value::Array(items)) => filter_well_formed(SliceName::UserDictionary, items, parse_dictionary_entry),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            debug!(found = %kind(other), "dictionary entries are not an array, using defaults");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_slices_yield_defaults() {
        assert_eq!(normalize_shortcuts(None), ShortcutConfig::default());
        assert_eq!(normalize_general(None), GeneralConfig::default());
        assert_eq!(normalize_zenzai(None), ZenzaiConfig::default());
        assert_eq!(normalize_symbol_width(None), SymbolWidthMap::default());
        assert_eq!(normalize_width_groups(None), CharacterWidthGroups::default());
        assert_eq!(normalize_romaji_rows(None), default_romaji_rows());
        assert!(normalize_dictionary(None).is_empty());
    }

    #[test]
    fn test_null_slices_yield_defaults() {
        let null = Value::Null;
        assert_eq!(normalize_shortcuts(Some(&null)), ShortcutConfig::default());
        assert_eq!(normalize_romaji_rows(Some(&null)), default_romaji_rows());
        assert!(normalize_dictionary(Some(&null)).is_empty());
    }

    #[test]
    fn test_shortcuts_ignore_wrong_types() {
        let raw = json!({ "ctrl_space_toggle": false, "alt_backquote_toggle": "no", "extra": 1 });
        let shortcuts = normalize_shortcuts(Some(&raw));
        assert!(!shortcuts.ctrl_space_toggle);
        assert!(shortcuts.alt_backquote_toggle);
    }

    #[test]
    fn test_general_unknown_value_reverts_to_default() {
        let raw = json!({
            "punctuation_style": "fullwidth_comma_kuten",
            "symbol_style": "bogus",
            "numpad_input": 3,
        });
        let general = normalize_general(Some(&raw));
        assert_eq!(general.punctuation_style, PunctuationStyle::FullwidthCommaKuten);
        assert_eq!(general.symbol_style, SymbolStyle::CornerBracketMiddleDot);
        assert_eq!(general.numpad_input, NumpadInputMode::AlwaysHalf);
    }

    #[test]
    fn test_general_migrates_legacy_space_input() {
        let raw = json!({ "space_input": "follow" });
        assert_eq!(normalize_general(Some(&raw)).space_input, SpaceInputMode::FollowInputMode);
    }

    #[test]
    fn test_zenzai_unknown_backend_falls_back_to_cpu() {
        let raw = json!({ "enable": true, "profile": "丁寧語", "backend": "metal" });
        let zenzai = normalize_zenzai(Some(&raw));
        assert!(zenzai.enable);
        assert_eq!(zenzai.profile, "丁寧語");
        assert_eq!(zenzai.backend, ZenzaiBackend::Cpu);
    }

    #[test]
    fn test_symbol_width_drops_unknown_keys() {
        let raw = json!({ "0": true, "~": false, "a": true, "!": "yes" });
        let map = normalize_symbol_width(Some(&raw));
        assert_eq!(map.0.len(), CHARACTER_WIDTH_SYMBOL_DEFAULTS.len());
        assert_eq!(map.is_fullwidth("0"), Some(true));
        assert_eq!(map.is_fullwidth("~"), Some(false));
        assert_eq!(map.is_fullwidth("!"), Some(true));
        assert!(map.is_fullwidth("a").is_none());
    }

    #[test]
    fn test_width_groups_overlay() {
        let raw = json!({ "tilde": "half", "number": "wide", "emoji": "full" });
        let groups = normalize_width_groups(Some(&raw));
        assert_eq!(groups.tilde, WidthMode::Half);
        assert_eq!(groups.number, WidthMode::Half);
        let mut expected = CharacterWidthGroups::default();
        expected.tilde = WidthMode::Half;
        assert_eq!(groups, expected);
    }

    #[test]
    fn test_romaji_rows_skip_malformed() {
        let raw = json!([
            { "input": "ka", "output": "か" },
            { "input": "kk", "output": "っ", "next_input": "k" },
            { "input": 1, "output": "x" },
            "garbage",
            { "input": "n", "output": "ん", "next_input": 5 },
        ]);
        let rows = normalize_romaji_rows(Some(&raw));
        assert_eq!(rows, vec![RomajiRule::new("ka", "か", ""), RomajiRule::new("kk", "っ", "k")]);
    }

    #[test]
    fn test_empty_romaji_array_is_kept_empty() {
        assert!(normalize_romaji_rows(Some(&json!([]))).is_empty());
    }

    #[test]
    fn test_dictionary_skips_malformed() {
        let raw = json!([
            { "reading": "あい", "word": "愛" },
            { "reading": "こい" },
            null,
        ]);
        assert_eq!(normalize_dictionary(Some(&raw)), vec![DictionaryEntry::new("あい", "愛")]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raws = [
            (SliceName::Shortcuts, json!({ "ctrl_space_toggle": 0 })),
            (SliceName::General, json!({ "space_input": "follow" })),
            (SliceName::Zenzai, json!({ "backend": "vulkan", "x": 1 })),
            (SliceName::SymbolWidth, json!({ "1": true, "z": false })),
            (SliceName::WidthGroups, json!({ "quote": "half" })),
            (SliceName::RomajiTable, json!([{ "input": "a", "output": "あ" }, 7])),
            (SliceName::UserDictionary, json!([{ "reading": "r", "word": "w" }, {}])),
        ];
        for (slice, raw) in raws {
            let once = normalize(slice, Some(&raw));
            let twice = normalize(slice, Some(&once));
            assert_eq!(once, twice, "{slice} not idempotent");
        }
        for slice in SliceName::ALL {
            let once = normalize(slice, None);
            assert_eq!(normalize(slice, Some(&once)), once, "{slice} defaults not idempotent");
        }
    }
}
