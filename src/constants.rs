//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Settings document location
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "ime-settings";

    /// Settings document file name
    pub const FILENAME: &str = "settings.json";

    /// Environment variable overriding the document path
    pub const PATH_ENV: &str = "IME_SETTINGS_CONFIG";
}

/// Top-level keys of the settings document
pub mod keys {
    pub const ZENZAI: &str = "zenzai";
    pub const SHORTCUTS: &str = "shortcuts";
    pub const GENERAL: &str = "general";
    pub const ROMAJI_TABLE: &str = "romaji_table";
    pub const ROMAJI_ROWS: &str = "rows";
    pub const CHARACTER_WIDTH: &str = "character_width";
    pub const SYMBOL_FULLWIDTH: &str = "symbol_fullwidth";
    pub const WIDTH_GROUPS: &str = "groups";
    pub const USER_DICTIONARY: &str = "user_dictionary";
    pub const DICTIONARY_ENTRIES: &str = "entries";
}

/// Cardinality limits enforced by the validator
pub mod limits {
    /// Maximum number of user dictionary entries
    pub const MAX_DICTIONARY_ENTRIES: usize = 50;
}

/// IPC socket constants
pub mod ipc {
    /// Socket path relative to the runtime (or cache) directory
    pub const SOCKET_NAME: &str = "ime-settings/settings.sock";

    /// Maximum message size (10 MB) to prevent DoS via memory exhaustion
    pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
}
