//! # Power-Up Catalog
//!
//! Immutable definitions of every power-up a user can buy.
//!
//! Entries are loaded once (from TOML or the built-in table) and never
//! change at runtime. The engine only depends on the [`Catalog`] lookup
//! trait, so a catalog backed by another store can be dropped in.
//!
//! ## Format
//!
//! ```toml
//! [[powerup]]
//! id = 2
//! name = "Reading Vision"
//! price = 25
//! effect_kind = "vision"
//! effect_magnitude = 30.0
//! duration_secs = 1800
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use powerup_core::PowerUpId;

/// What a power-up does when used.
///
/// The set is open: kinds this build does not know are kept verbatim in
/// [`EffectKind::Other`] so a newer catalog still loads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EffectKind {
    /// Reveals a contextual hint.
    Hint,
    /// Highlights key words.
    Vision,
    /// Allows retrying an exercise.
    Retry,
    /// Adds time to a timed exercise.
    TimeExtension,
    /// Multiplies rewards.
    Multiplier,
    /// Completes an exercise automatically.
    AutoComplete,
    /// Generic boost.
    Boost,
    /// Protects a streak or score.
    Protection,
    /// Any other kind.
    Other(String),
}

impl EffectKind {
    /// Returns the kebab-case name used in config files.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hint => "hint",
            Self::Vision => "vision",
            Self::Retry => "retry",
            Self::TimeExtension => "time-extension",
            Self::Multiplier => "multiplier",
            Self::AutoComplete => "auto-complete",
            Self::Boost => "boost",
            Self::Protection => "protection",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for EffectKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "hint" => Self::Hint,
            "vision" => Self::Vision,
            "retry" => Self::Retry,
            "time-extension" => Self::TimeExtension,
            "multiplier" => Self::Multiplier,
            "auto-complete" => Self::AutoComplete,
            "boost" => Self::Boost,
            "protection" => Self::Protection,
            _ => Self::Other(name),
        }
    }
}

impl From<EffectKind> for String {
    fn from(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store shelf a power-up is listed on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Basic study aids.
    #[default]
    Core,
    /// Stronger effects.
    Advanced,
    /// Rare or event items.
    Premium,
}

/// A power-up definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// Unique identifier.
    pub id: PowerUpId,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Store shelf.
    #[serde(default)]
    pub category: Category,
    /// Price per unit in currency units.
    pub price: u64,
    /// What the item does.
    pub effect_kind: EffectKind,
    /// Strength of the effect (meaning depends on the kind).
    #[serde(default = "unit_magnitude")]
    pub effect_magnitude: f64,
    /// Present if the effect lasts for a while after use.
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Present if the item must recharge after its effect ends.
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
    /// Lifetime cap on uses per user.
    #[serde(default)]
    pub max_usages: Option<u32>,
    /// Gated entry: new records start `Locked`.
    #[serde(default)]
    pub locked: bool,
}

fn unit_magnitude() -> f64 {
    1.0
}

impl CatalogEntry {
    /// Creates an instant-effect entry.
    #[must_use]
    pub fn new(id: PowerUpId, name: impl Into<String>, price: u64, effect_kind: EffectKind) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            category: Category::Core,
            price,
            effect_kind,
            effect_magnitude: unit_magnitude(),
            duration_secs: None,
            cooldown_secs: None,
            max_usages: None,
            locked: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the category.
    #[must_use]
    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Sets the effect magnitude.
    #[must_use]
    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.effect_magnitude = magnitude;
        self
    }

    /// Makes the entry timed.
    #[must_use]
    pub const fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Gives the entry a cooldown.
    #[must_use]
    pub const fn with_cooldown(mut self, secs: u64) -> Self {
        self.cooldown_secs = Some(secs);
        self
    }

    /// Caps lifetime uses.
    #[must_use]
    pub const fn with_max_usages(mut self, max: u32) -> Self {
        self.max_usages = Some(max);
        self
    }

    /// Gates the entry.
    #[must_use]
    pub const fn gated(mut self) -> Self {
        self.locked = true;
        self
    }

    /// True if using the item starts a timed effect.
    #[inline]
    #[must_use]
    pub const fn is_timed(&self) -> bool {
        self.duration_secs.is_some()
    }

    /// True if the item recharges after its effect ends.
    #[inline]
    #[must_use]
    pub const fn has_cooldown(&self) -> bool {
        self.cooldown_secs.is_some()
    }

    /// True if the item has neither duration nor cooldown.
    #[inline]
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        !self.is_timed() && !self.has_cooldown()
    }

    /// Checks the entry for values that would break the state machine.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an empty name, a zero-second
    /// duration or cooldown, a zero usage cap or a non-finite magnitude.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "power-up {} has an empty name",
                self.id
            )));
        }
        if self.duration_secs == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "power-up {} has a zero duration (omit it for instant effects)",
                self.id
            )));
        }
        if self.cooldown_secs == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "power-up {} has a zero cooldown (omit it instead)",
                self.id
            )));
        }
        if self.max_usages == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "power-up {} can never be used (max_usages = 0)",
                self.id
            )));
        }
        if !self.effect_magnitude.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "power-up {} has a non-finite effect magnitude",
                self.id
            )));
        }
        Ok(())
    }
}

/// Read-only lookup of catalog entries.
pub trait Catalog: Send + Sync {
    /// Looks up an entry by id.
    fn get(&self, id: PowerUpId) -> Option<&CatalogEntry>;
}

/// On-disk shape of a catalog file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    powerup: Vec<CatalogEntry>,
}

/// In-memory catalog, immutable after construction.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    entries: BTreeMap<PowerUpId, CatalogEntry>,
}

impl StaticCatalog {
    /// Builds a catalog from entries, validating each one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` on duplicate ids or invalid entries.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> ConfigResult<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            entry.validate()?;
            if map.contains_key(&entry.id) {
                return Err(ConfigError::Invalid(format!(
                    "power-up id {} defined twice",
                    entry.id
                )));
            }
            map.insert(entry.id, entry);
        }
        Ok(Self { entries: map })
    }

    /// Parses a catalog from TOML text (`[[powerup]]` tables).
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed TOML, or `Invalid` as
    /// [`StaticCatalog::from_entries`].
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        Self::from_entries(file.powerup)
    }

    /// Loads a catalog from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`StaticCatalog::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The stock catalog: the three study aids every user starts with.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = [
            CatalogEntry::new(1, "Hint", 15, EffectKind::Hint)
                .with_description("Reveals a contextual hint for the current exercise"),
            CatalogEntry::new(2, "Reading Vision", 25, EffectKind::Vision)
                .with_description("Highlights key words for 30 minutes")
                .with_magnitude(30.0)
                .with_duration(30 * 60),
            CatalogEntry::new(3, "Second Chance", 40, EffectKind::Retry)
                .with_description("Retry an exercise once")
                .with_category(Category::Advanced)
                .with_cooldown(60 * 60),
        ];
        Self {
            entries: entries.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn get(&self, id: PowerUpId) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }
}
