use std::collections::HashMap;

use crate::models::UNKNOWN;

pub const NORTH_AMERICA: &str = "North America";
pub const EUROPE: &str = "Europe";
pub const ASIA: &str = "Asia";
pub const OCEANIA: &str = "Oceania";
pub const SOUTH_AMERICA: &str = "South America";
pub const AFRICA: &str = "Africa";

// (display name, ISO 3166 alpha-2, region). The lookup service answers with either form.
const COUNTRIES: &[(&str, &str, &str)] = &[
    ("United States", "US", NORTH_AMERICA),
    ("Canada", "CA", NORTH_AMERICA),
    ("Mexico", "MX", NORTH_AMERICA),
    ("Jamaica", "JM", NORTH_AMERICA),
    ("Puerto Rico", "PR", NORTH_AMERICA),
    ("United Kingdom", "GB", EUROPE),
    ("Ireland", "IE", EUROPE),
    ("Germany", "DE", EUROPE),
    ("France", "FR", EUROPE),
    ("Spain", "ES", EUROPE),
    ("Italy", "IT", EUROPE),
    ("Netherlands", "NL", EUROPE),
    ("Belgium", "BE", EUROPE),
    ("Sweden", "SE", EUROPE),
    ("Norway", "NO", EUROPE),
    ("Finland", "FI", EUROPE),
    ("Denmark", "DK", EUROPE),
    ("Iceland", "IS", EUROPE),
    ("Poland", "PL", EUROPE),
    ("Portugal", "PT", EUROPE),
    ("Austria", "AT", EUROPE),
    ("Switzerland", "CH", EUROPE),
    ("Russia", "RU", EUROPE),
    ("Ukraine", "UA", EUROPE),
    ("Japan", "JP", ASIA),
    ("South Korea", "KR", ASIA),
    ("China", "CN", ASIA),
    ("Taiwan", "TW", ASIA),
    ("India", "IN", ASIA),
    ("Philippines", "PH", ASIA),
    ("Indonesia", "ID", ASIA),
    ("Australia", "AU", OCEANIA),
    ("New Zealand", "NZ", OCEANIA),
    ("Brazil", "BR", SOUTH_AMERICA),
    ("Argentina", "AR", SOUTH_AMERICA),
    ("Chile", "CL", SOUTH_AMERICA),
    ("Colombia", "CO", SOUTH_AMERICA),
    ("Peru", "PE", SOUTH_AMERICA),
    ("South Africa", "ZA", AFRICA),
    ("Nigeria", "NG", AFRICA),
    ("Egypt", "EG", AFRICA),
    ("Ghana", "GH", AFRICA),
    ("Kenya", "KE", AFRICA),
];

// Short forms and sub-national areas that show up as area names.
const ALIASES: &[(&str, &str)] = &[
    ("USA", NORTH_AMERICA),
    ("UK", EUROPE),
    ("England", EUROPE),
    ("Scotland", EUROPE),
    ("Wales", EUROPE),
    ("Northern Ireland", EUROPE),
    ("Korea", ASIA),
];

/// Exact-match mapping from a country identifier to its region.
#[derive(Debug, Clone)]
pub struct RegionMap {
    regions: HashMap<String, String>,
}

impl Default for RegionMap {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RegionMap {
    pub fn builtin() -> Self {
        let mut regions = HashMap::with_capacity(COUNTRIES.len() * 2 + ALIASES.len());
        for (name, code, region) in COUNTRIES {
            regions.insert(name.to_string(), region.to_string());
            regions.insert(code.to_string(), region.to_string());
        }
        for (alias, region) in ALIASES {
            regions.insert(alias.to_string(), region.to_string());
        }
        Self { regions }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            regions: pairs
                .into_iter()
                .map(|(country, region)| (country.into(), region.into()))
                .collect(),
        }
    }

    /// Region for `country`, or `Unknown` when the country is not mapped.
    pub fn region_of(&self, country: &str) -> &str {
        self.regions
            .get(country)
            .map(String::as_str)
            .unwrap_or(UNKNOWN)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
