use crate::error::TrendsError;

/// Relative time range of an interest-over-time query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum TimeWindow {
    #[strum(to_string = "1h", serialize = "now 1-H")]
    #[serde(rename = "1h")]
    /// Trailing hour.
    PastHour,
    #[strum(to_string = "4h", serialize = "now 4-H")]
    #[serde(rename = "4h")]
    /// Trailing four hours.
    PastFourHours,
    #[strum(to_string = "1d", serialize = "now 1-d")]
    #[serde(rename = "1d")]
    /// Trailing day.
    PastDay,
    #[strum(to_string = "7d", serialize = "now 7-d")]
    #[serde(rename = "7d")]
    /// Trailing seven days.
    PastWeek,
    #[strum(to_string = "1m", serialize = "today 1-m")]
    #[serde(rename = "1m")]
    /// Trailing thirty days.
    PastMonth,
    #[strum(to_string = "3m", serialize = "today 3-m")]
    #[serde(rename = "3m")]
    /// Trailing ninety days.
    PastThreeMonths,
    #[strum(to_string = "12m", serialize = "today 12-m")]
    #[serde(rename = "12m")]
    /// Trailing twelve months.
    PastTwelveMonths,
    #[default]
    #[strum(to_string = "5y", serialize = "today 5-y")]
    #[serde(rename = "5y")]
    /// Trailing five years.
    PastFiveYears,
    #[strum(serialize = "all")]
    #[serde(rename = "all")]
    /// Since 2004.
    AllTime,
}

impl TimeWindow {
    /// The timeframe string the upstream expects.
    pub fn timeframe(&self) -> &'static str {
        match self {
            Self::PastHour => "now 1-H",
            Self::PastFourHours => "now 4-H",
            Self::PastDay => "now 1-d",
            Self::PastWeek => "now 7-d",
            Self::PastMonth => "today 1-m",
            Self::PastThreeMonths => "today 3-m",
            Self::PastTwelveMonths => "today 12-m",
            Self::PastFiveYears => "today 5-y",
            Self::AllTime => "all",
        }
    }

    /// Parse a short alias (`5y`) or upstream timeframe (`today 5-y`).
    pub fn parse(value: &str) -> Result<Self, TrendsError> {
        value
            .trim()
            .parse()
            .map_err(|_| TrendsError::invalid(format!("unknown time window '{}'", value)))
    }
}
