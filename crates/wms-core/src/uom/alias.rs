//! Short unit codes and their canonical long forms.

use std::collections::HashMap;

/// Abbreviations used on shop-floor reports, mapped to the names the
/// conversion tables use.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("ea", "eaches"),
    ("cs", "cases"),
    ("pl", "pallets"),
    ("rl", "rolls"),
    ("lbs", "pounds"),
    ("bdl", "bundles"),
    ("pk", "packs"),
    ("kg", "kilograms"),
    ("ltr", "liters"),
    ("box", "boxes"),
    ("gal", "gallons"),
    ("ft", "feet"),
];

/// Alias table applied once before any conversion lookup.
///
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitAliases {
    map: HashMap<String, String>,
}

impl UnitAliases {
    /// An alias table with no entries.
    pub fn empty() -> Self {
        UnitAliases {
            map: HashMap::new(),
        }
    }

    /// Adds or replaces an alias.
    pub fn insert(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.map.insert(alias.into(), canonical.into());
    }

    /// Default table extended (and overridden) by `extra`.
    pub fn with_overrides<I, A, C>(extra: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: Into<String>,
        C: Into<String>,
    {
        let mut aliases = Self::default();
        for (alias, canonical) in extra {
            aliases.insert(alias, canonical);
        }
        aliases
    }

    /// Rewrites `unit` to its canonical form, or returns it unchanged.
    pub fn normalize<'a>(&'a self, unit: &'a str) -> &'a str {
        self.map.get(unit).map(String::as_str).unwrap_or(unit)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for UnitAliases {
    fn default() -> Self {
        let mut aliases = Self::empty();
        for (alias, canonical) in DEFAULT_ALIASES {
            aliases.insert(*alias, *canonical);
        }
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aliases() {
        let aliases = UnitAliases::default();
        assert_eq!(aliases.len(), 12);
        assert_eq!(aliases.normalize("cs"), "cases");
        assert_eq!(aliases.normalize("ea"), "eaches");
        assert_eq!(aliases.normalize("ft"), "feet");
    }

    #[test]
    fn test_unknown_unit_passes_through() {
        let aliases = UnitAliases::default();
        assert_eq!(aliases.normalize("cases"), "cases");
        assert_eq!(aliases.normalize("CS"), "CS");
    }

    #[test]
    fn test_overrides() {
        let aliases = UnitAliases::with_overrides([("cs", "cartons"), ("dz", "dozens")]);
        assert_eq!(aliases.normalize("cs"), "cartons");
        assert_eq!(aliases.normalize("dz"), "dozens");
        assert_eq!(aliases.normalize("pl"), "pallets");
    }
}
