//! Settings document model
//!
//! - **schema**: defaults and closed enumerations for every slice
//! - **normalize**: total functions turning stored values into canonical slices
//! - **validate**: acceptance checks for edited sequence slices
//! - **document**: the document itself and the typed [`Slice`] views over it

pub mod document;
pub mod normalize;
pub mod schema;
pub mod validate;

// Re-export commonly used types
pub use document::{
    ConfigDocument, General, RomajiTable, Shortcuts, Slice, SliceName, SymbolWidth, UserDictionary,
    WidthGroups, Zenzai,
};
pub use normalize::normalize;
pub use schema::{
    CharacterWidthGroups, DictionaryEntry, GeneralConfig, NumpadInputMode, PunctuationStyle,
    RomajiRule, ShortcutConfig, SpaceInputMode, SymbolStyle, SymbolWidthMap, WidthGroup, WidthMode,
    ZenzaiBackend, ZenzaiConfig,
};
pub use validate::ValidationFailure;
