//! The fixed set of logical datasets the school works with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage key holding the pre-bucket monolithic blob.
pub const LEGACY_KEY: &str = "hondenschool.data";

/// Storage key set once the legacy blob has been split into buckets.
pub const MIGRATION_FLAG_KEY: &str = "hondenschool.migrated.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Lessen,
    Reeksen,
    Locaties,
    Trainers,
    Pakketten,
    Klassen,
    Mededelingen,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Lessen,
        Collection::Reeksen,
        Collection::Locaties,
        Collection::Trainers,
        Collection::Pakketten,
        Collection::Klassen,
        Collection::Mededelingen,
    ];

    /// Lowercase name used as the exec-style `mode` and in static file paths.
    pub fn mode(&self) -> &'static str {
        match self {
            Collection::Lessen => "lessen",
            Collection::Reeksen => "reeksen",
            Collection::Locaties => "locaties",
            Collection::Trainers => "trainers",
            Collection::Pakketten => "pakketten",
            Collection::Klassen => "klassen",
            Collection::Mededelingen => "mededelingen",
        }
    }

    /// Tab name understood by the legacy `?sheet=` endpoint.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Collection::Lessen => "Lessen",
            Collection::Reeksen => "Reeksen",
            Collection::Locaties => "Locaties",
            Collection::Trainers => "Trainers",
            Collection::Pakketten => "Pakketten",
            Collection::Klassen => "Klassen",
            Collection::Mededelingen => "Mededelingen",
        }
    }

    /// Key of the local bucket mirroring this collection.
    pub fn bucket_key(&self) -> String {
        format!("hondenschool.{}", self.mode())
    }

    /// Path of the statically hosted export, relative to the site origin.
    pub fn static_path(&self) -> String {
        format!("/data/{}.json", self.mode())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mode())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Collection::ALL
            .into_iter()
            .find(|c| c.mode() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Collection::ALL.iter().map(|c| c.mode()).collect();
                format!("Unknown collection '{}'. Known: {}", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_keys() {
        assert_eq!(Collection::Lessen.mode(), "lessen");
        assert_eq!(Collection::Lessen.sheet_name(), "Lessen");
        assert_eq!(Collection::Klassen.bucket_key(), "hondenschool.klassen");
        assert_eq!(Collection::Pakketten.static_path(), "/data/pakketten.json");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Reeksen".parse::<Collection>(), Ok(Collection::Reeksen));
        assert_eq!(" trainers ".parse::<Collection>(), Ok(Collection::Trainers));
        assert!("honden".parse::<Collection>().is_err());
    }
}
