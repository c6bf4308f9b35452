use crate::error::TrendsError;
use std::fmt;
use std::str::FromStr;

/// Markets the upstream accepts, as (ISO-3166 alpha-2, label).
pub const KNOWN_REGIONS: &[(&str, &str)] = &[
    ("US", "United States"),
    ("CN", "China"),
    ("GB", "United Kingdom"),
    ("DE", "Germany"),
    ("JP", "Japan"),
    ("FR", "France"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("IN", "India"),
    ("BR", "Brazil"),
    ("MX", "Mexico"),
    ("KR", "South Korea"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("NL", "Netherlands"),
    ("SA", "Saudi Arabia"),
    ("TR", "Turkey"),
    ("ID", "Indonesia"),
    ("VN", "Vietnam"),
];

/// Label used for the worldwide region.
pub const WORLDWIDE_LABEL: &str = "Global";

/// A validated region: one of [`KNOWN_REGIONS`] or worldwide.
///
/// Worldwide is encoded as the empty string on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize)]
#[serde(into = "String")]
pub struct RegionCode(&'static str);

// Deserialized via `TryFrom<String>`; hand-written because the derive would
// implicitly borrow the `&'static str` field and require `'de: 'static`.
impl<'de> serde::Deserialize<'de> for RegionCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::try_from(code).map_err(serde::de::Error::custom)
    }
}

impl RegionCode {
    /// The worldwide region.
    pub const fn worldwide() -> Self {
        Self("")
    }

    /// Parse a region code case-insensitively. The empty string is worldwide.
    pub fn parse(code: &str) -> Result<Self, TrendsError> {
        let code = code.trim();

        if code.is_empty() {
            return Ok(Self::worldwide());
        }

        KNOWN_REGIONS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(code))
            .map(|(known, _)| Self(known))
            .ok_or_else(|| TrendsError::invalid(format!("unknown region code '{}'", code)))
    }

    /// The code sent upstream as `geo`. Empty for worldwide.
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Is this the worldwide region.
    pub fn is_worldwide(&self) -> bool {
        self.0.is_empty()
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        if self.is_worldwide() {
            return WORLDWIDE_LABEL;
        }
        KNOWN_REGIONS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, label)| *label)
            .unwrap_or(WORLDWIDE_LABEL)
    }

    /// All selectable regions, worldwide first.
    pub fn all() -> impl Iterator<Item = RegionCode> {
        std::iter::once(Self::worldwide()).chain(KNOWN_REGIONS.iter().map(|(c, _)| Self(c)))
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for RegionCode {
    type Err = TrendsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = TrendsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(region: RegionCode) -> Self {
        region.0.to_string()
    }
}
