//! Schema defaults for every settings slice
//!
//! Single source of truth for default values and the closed enumerations each
//! slice accepts. Normalization and validation both build on these types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Legacy per-symbol width table: symbol key → fullwidth by default?
pub const CHARACTER_WIDTH_SYMBOL_DEFAULTS: [(&str, bool); 42] = [
    ("0", false),
    ("1", false),
    ("2", false),
    ("3", false),
    ("4", false),
    ("5", false),
    ("6", false),
    ("7", false),
    ("8", false),
    ("9", false),
    ("!", true),
    ("\"", true),
    ("#", false),
    ("$", false),
    ("%", false),
    ("&", false),
    ("'", true),
    ("(", true),
    (")", true),
    ("*", true),
    ("+", true),
    (",", true),
    ("-", true),
    (".", true),
    ("/", true),
    (":", true),
    (";", true),
    ("<", true),
    ("=", true),
    (">", true),
    ("?", true),
    ("@", false),
    ("[", true),
    ("\\", false),
    ("]", true),
    ("^", false),
    ("_", false),
    ("`", false),
    ("{", true),
    ("|", false),
    ("}", true),
    ("~", true),
];

/// Returns the default fullwidth flag for a symbol key, or None if the key
/// is outside the closed set
pub fn symbol_default(key: &str) -> Option<bool> {
    CHARACTER_WIDTH_SYMBOL_DEFAULTS
        .iter()
        .find(|(symbol, _)| *symbol == key)
        .map(|&(_, is_fullwidth)| is_fullwidth)
}

/// Legacy flat width map (symbol key → fullwidth)
///
/// Always holds exactly the keys of [`CHARACTER_WIDTH_SYMBOL_DEFAULTS`] once
/// normalized. Ordered so the serialized form is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolWidthMap(pub BTreeMap<String, bool>);

impl Default for SymbolWidthMap {
    fn default() -> Self {
        Self(
            CHARACTER_WIDTH_SYMBOL_DEFAULTS
                .into_iter()
                .map(|(symbol, is_fullwidth)| (symbol.to_string(), is_fullwidth))
                .collect(),
        )
    }
}

impl SymbolWidthMap {
    pub fn is_fullwidth(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    /// Set a key inside the closed set. Returns false (and changes nothing)
    /// for keys outside it.
    pub fn set(&mut self, key: &str, is_fullwidth: bool) -> bool {
        if symbol_default(key).is_none() {
            return false;
        }
        self.0.insert(key.to_string(), is_fullwidth);
        true
    }

    /// Rebuild over the closed key set: missing keys take their default and
    /// keys outside the set are dropped
    pub fn canonical(self) -> Self {
        let mut canonical = Self::default();
        for (key, is_fullwidth) in self.0 {
            canonical.set(&key, is_fullwidth);
        }
        canonical
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WidthMode {
    Half,
    Full,
}

impl WidthMode {
    pub const ALL: [WidthMode; 2] = [WidthMode::Half, WidthMode::Full];

    pub fn as_str(self) -> &'static str {
        match self {
            WidthMode::Half => "half",
            WidthMode::Full => "full",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == text)
    }
}

/// Names of the grouped width settings
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WidthGroup {
    Alphabet,
    Number,
    Bracket,
    CommaPeriod,
    MiddleDotCornerBracket,
    Quote,
    ColonSemicolon,
    HashGroup,
    Tilde,
    MathSymbol,
    QuestionExclamation,
}

impl WidthGroup {
    pub const ALL: [WidthGroup; 11] = [
        WidthGroup::Alphabet,
        WidthGroup::Number,
        WidthGroup::Bracket,
        WidthGroup::CommaPeriod,
        WidthGroup::MiddleDotCornerBracket,
        WidthGroup::Quote,
        WidthGroup::ColonSemicolon,
        WidthGroup::HashGroup,
        WidthGroup::Tilde,
        WidthGroup::MathSymbol,
        WidthGroup::QuestionExclamation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WidthGroup::Alphabet => "alphabet",
            WidthGroup::Number => "number",
            WidthGroup::Bracket => "bracket",
            WidthGroup::CommaPeriod => "comma_period",
            WidthGroup::MiddleDotCornerBracket => "middle_dot_corner_bracket",
            WidthGroup::Quote => "quote",
            WidthGroup::ColonSemicolon => "colon_semicolon",
            WidthGroup::HashGroup => "hash_group",
            WidthGroup::Tilde => "tilde",
            WidthGroup::MathSymbol => "math_symbol",
            WidthGroup::QuestionExclamation => "question_exclamation",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|group| group.as_str() == name)
    }
}

/// Grouped width settings, one half/full choice per group
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CharacterWidthGroups {
    pub alphabet: WidthMode,
    pub number: WidthMode,
    pub bracket: WidthMode,
    pub comma_period: WidthMode,
    pub middle_dot_corner_bracket: WidthMode,
    pub quote: WidthMode,
    pub colon_semicolon: WidthMode,
    pub hash_group: WidthMode,
    pub tilde: WidthMode,
    pub math_symbol: WidthMode,
    pub question_exclamation: WidthMode,
}

impl Default for CharacterWidthGroups {
    fn default() -> Self {
        Self {
            alphabet: WidthMode::Half,
            number: WidthMode::Half,
            bracket: WidthMode::Full,
            comma_period: WidthMode::Full,
            middle_dot_corner_bracket: WidthMode::Full,
            quote: WidthMode::Full,
            colon_semicolon: WidthMode::Full,
            hash_group: WidthMode::Half,
            tilde: WidthMode::Full,
            math_symbol: WidthMode::Full,
            question_exclamation: WidthMode::Full,
        }
    }
}

impl CharacterWidthGroups {
    pub fn get(&self, group: WidthGroup) -> WidthMode {
        match group {
            WidthGroup::Alphabet => self.alphabet,
            WidthGroup::Number => self.number,
            WidthGroup::Bracket => self.bracket,
            WidthGroup::CommaPeriod => self.comma_period,
            WidthGroup::MiddleDotCornerBracket => self.middle_dot_corner_bracket,
            WidthGroup::Quote => self.quote,
            WidthGroup::ColonSemicolon => self.colon_semicolon,
            WidthGroup::HashGroup => self.hash_group,
            WidthGroup::Tilde => self.tilde,
            WidthGroup::MathSymbol => self.math_symbol,
            WidthGroup::QuestionExclamation => self.question_exclamation,
        }
    }

    pub fn set(&mut self, group: WidthGroup, mode: WidthMode) {
        let slot = match group {
            WidthGroup::Alphabet => &mut self.alphabet,
            WidthGroup::Number => &mut self.number,
            WidthGroup::Bracket => &mut self.bracket,
            WidthGroup::CommaPeriod => &mut self.comma_period,
            WidthGroup::MiddleDotCornerBracket => &mut self.middle_dot_corner_bracket,
            WidthGroup::Quote => &mut self.quote,
            WidthGroup::ColonSemicolon => &mut self.colon_semicolon,
            WidthGroup::HashGroup => &mut self.hash_group,
            WidthGroup::Tilde => &mut self.tilde,
            WidthGroup::MathSymbol => &mut self.math_symbol,
            WidthGroup::QuestionExclamation => &mut self.question_exclamation,
        };
        *slot = mode;
    }
}

/// Implements the closed-set helpers shared by every style enum
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn parse(text: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|value| value.as_str() == text)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// How `,` and `.` are converted in kana mode
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PunctuationStyle {
    #[default]
    ToutenKuten,
    FullwidthCommaFullwidthPeriod,
    ToutenFullwidthPeriod,
    FullwidthCommaKuten,
}

string_enum!(PunctuationStyle {
    ToutenKuten => "touten_kuten",
    FullwidthCommaFullwidthPeriod => "fullwidth_comma_fullwidth_period",
    ToutenFullwidthPeriod => "touten_fullwidth_period",
    FullwidthCommaKuten => "fullwidth_comma_kuten",
});

/// How `[`, `]`, `/` and `\` are converted in kana mode
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SymbolStyle {
    #[default]
    CornerBracketMiddleDot,
    SquareBracketBackslash,
    CornerBracketBackslash,
    SquareBracketMiddleDot,
}

string_enum!(SymbolStyle {
    CornerBracketMiddleDot => "corner_bracket_middle_dot",
    SquareBracketBackslash => "square_bracket_backslash",
    CornerBracketBackslash => "corner_bracket_backslash",
    SquareBracketMiddleDot => "square_bracket_middle_dot",
});

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpaceInputMode {
    #[default]
    AlwaysHalf,
    FollowInputMode,
}

string_enum!(SpaceInputMode {
    AlwaysHalf => "always_half",
    FollowInputMode => "follow_input_mode",
});

impl SpaceInputMode {
    /// Values written by older releases that map onto a current variant
    pub fn from_legacy(text: &str) -> Option<Self> {
        match text {
            "follow" => Some(SpaceInputMode::FollowInputMode),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumpadInputMode {
    #[default]
    AlwaysHalf,
    FollowInputMode,
}

string_enum!(NumpadInputMode {
    AlwaysHalf => "always_half",
    FollowInputMode => "follow_input_mode",
});

/// Acceleration backend for the zenzai conversion model
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZenzaiBackend {
    #[default]
    Cpu,
    Cuda,
    Vulkan,
}

string_enum!(ZenzaiBackend {
    Cpu => "cpu",
    Cuda => "cuda",
    Vulkan => "vulkan",
});

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct GeneralConfig {
    pub punctuation_style: PunctuationStyle,
    pub symbol_style: SymbolStyle,
    pub space_input: SpaceInputMode,
    pub numpad_input: NumpadInputMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ShortcutConfig {
    pub ctrl_space_toggle: bool,
    pub alt_backquote_toggle: bool,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            ctrl_space_toggle: true,
            alt_backquote_toggle: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct ZenzaiConfig {
    pub enable: bool,
    pub profile: String,
    pub backend: ZenzaiBackend,
}

/// One romaji conversion rule
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RomajiRule {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub next_input: String,
}

impl RomajiRule {
    pub fn new(input: &str, output: &str, next_input: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            next_input: next_input.to_string(),
        }
    }
}

/// One user dictionary word
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub reading: String,
    pub word: String,
}

impl DictionaryEntry {
    pub fn new(reading: &str, word: &str) -> Self {
        Self {
            reading: reading.to_string(),
            word: word.to_string(),
        }
    }
}

static DEFAULT_ROMAJI_ROWS: LazyLock<Vec<RomajiRule>> = LazyLock::new(|| {
    include_str!("default_romaji_table.txt")
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }

            let mut parts = trimmed.split('\t');
            let input = parts.next()?.trim();
            let output = parts.next()?.trim();
            if input.is_empty() || output.is_empty() {
                return None;
            }
            let next_input = parts.next().unwrap_or_default().trim();

            Some(RomajiRule::new(input, output, next_input))
        })
        .collect()
});

/// Rows of the bundled default romaji table
pub fn default_romaji_rows() -> Vec<RomajiRule> {
    DEFAULT_ROMAJI_ROWS.clone()
}
