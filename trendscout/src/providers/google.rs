//! Google Trends web API provider.
//!
//! Two calls per batch: `explore` hands out a signed token for the
//! TIMESERIES widget, and `widgetdata/multiline` returns its rows. Both
//! responses start with an anti-hijacking prefix before the JSON object.

use super::{Timeline, TimelineRow, TrendsProvider};
use crate::acquisition::KeywordBatch;
use crate::client::Client;
use crate::configuration::{Configuration, DEFAULT_LANGUAGE, DEFAULT_TZ};
use crate::error::TrendsError;
use crate::region::RegionCode;
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Default Google Trends endpoint.
pub const DEFAULT_API_URL: &str = "https://trends.google.com";

const EXPLORE_PATH: &str = "/trends/api/explore";
const MULTILINE_PATH: &str = "/trends/api/widgetdata/multiline";
const TIMESERIES_WIDGET: &str = "TIMESERIES";
/// Max bytes of an error body kept in messages.
const BODY_EXCERPT: usize = 200;

lazy_static! {
    /// Base url override from `TRENDSCOUT_API_URL`.
    static ref ENV_API_URL: Option<String> = std::env::var("TRENDSCOUT_API_URL")
        .ok()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty());
}

/// Google Trends provider.
///
/// # Example
/// ```ignore
/// use trendscout::providers::{GoogleTrends, TrendsProvider};
///
/// let provider = GoogleTrends::new().with_language("de-DE");
/// let timeline = provider.interest_over_time(&batch, &region, window, &client).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GoogleTrends {
    api_url: Option<String>,
    language: String,
    tz: i32,
    category: u32,
}

impl Default for GoogleTrends {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleTrends {
    /// Create a provider with the default endpoint, `en-US` and `tz=360`.
    pub fn new() -> Self {
        Self {
            api_url: None,
            language: DEFAULT_LANGUAGE.into(),
            tz: DEFAULT_TZ,
            category: 0,
        }
    }

    /// Create a provider from the configuration.
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            api_url: config.api_url.clone(),
            language: config.language.clone(),
            tz: config.tz,
            category: config.category,
        }
    }

    /// Use a custom API endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Interface language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Timezone offset in minutes.
    pub fn with_tz(mut self, tz: i32) -> Self {
        self.tz = tz;
        self
    }

    /// Category filter.
    pub fn with_category(mut self, category: u32) -> Self {
        self.category = category;
        self
    }

    /// Get the API base URL.
    pub fn endpoint(&self) -> &str {
        self.api_url
            .as_deref()
            .or(ENV_API_URL.as_deref())
            .unwrap_or(DEFAULT_API_URL)
    }

    /// The `req` payload of the explore call.
    pub fn explore_request(
        &self,
        batch: &KeywordBatch,
        region: &RegionCode,
        window: TimeWindow,
    ) -> serde_json::Value {
        let items: Vec<_> = batch
            .keywords()
            .iter()
            .map(|keyword| {
                serde_json::json!({
                    "keyword": keyword,
                    "time": window.timeframe(),
                    "geo": region.as_str(),
                })
            })
            .collect();

        serde_json::json!({
            "comparisonItem": items,
            "category": self.category,
            "property": "",
        })
    }

    /// GET a guarded JSON document.
    async fn get_json<T: DeserializeOwned>(
        &self,
        client: &Client,
        path: &str,
        req: &str,
        token: Option<&str>,
    ) -> Result<T, TrendsError> {
        let tz = self.tz.to_string();
        let mut params = vec![("hl", self.language.as_str()), ("tz", tz.as_str()), ("req", req)];

        if let Some(token) = token {
            params.push(("token", token));
        }

        let response = client
            .get(format!("{}{}", self.endpoint(), path))
            .query(&params)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrendsError::from_status(status.as_u16(), excerpt(&body)));
        }

        let body = response.text().await?;

        Ok(serde_json::from_str(strip_guard(&body)?)?)
    }
}

impl TrendsProvider for GoogleTrends {
    async fn interest_over_time(
        &self,
        batch: &KeywordBatch,
        region: &RegionCode,
        window: TimeWindow,
        client: &Client,
    ) -> Result<Timeline, TrendsError> {
        let explore_req = serde_json::to_string(&self.explore_request(batch, region, window))?;
        let explore: ExploreResponse = self.get_json(client, EXPLORE_PATH, &explore_req, None).await?;

        let widget = match explore
            .widgets
            .into_iter()
            .find(|w| w.id == TIMESERIES_WIDGET)
        {
            Some(widget) => widget,
            None => {
                log::debug!("no {} widget for {:?}", TIMESERIES_WIDGET, batch.keywords());
                return Ok(Timeline::empty(batch.keywords().to_vec()));
            }
        };

        let widget_req = serde_json::to_string(&widget.request)?;
        let multiline: MultilineResponse = self
            .get_json(client, MULTILINE_PATH, &widget_req, Some(&widget.token))
            .await?;

        let rows = multiline
            .default
            .timeline_data
            .into_iter()
            .map(RawRow::into_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Timeline {
            keywords: batch.keywords().to_vec(),
            rows,
        })
    }

    fn provider_name(&self) -> &'static str {
        "google_trends"
    }

    fn requests_per_batch(&self) -> u32 {
        2
    }
}

/// Drop everything before the first JSON object.
pub fn strip_guard(body: &str) -> Result<&str, TrendsError> {
    body.find('{')
        .map(|start| &body[start..])
        .ok_or_else(|| TrendsError::Decode("response has no JSON object".into()))
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    widgets: Vec<Widget>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    #[serde(default)]
    id: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    request: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct MultilineResponse {
    #[serde(default)]
    default: MultilineData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultilineData {
    #[serde(default)]
    timeline_data: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRow {
    time: String,
    #[serde(default)]
    value: Vec<u32>,
    #[serde(default)]
    has_data: Vec<bool>,
    #[serde(default)]
    is_partial: bool,
}

impl RawRow {
    fn into_row(self) -> Result<TimelineRow, TrendsError> {
        let secs: i64 = self
            .time
            .trim()
            .parse()
            .map_err(|_| TrendsError::Decode(format!("bad timestamp '{}'", self.time)))?;
        let timestamp: DateTime<Utc> = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| TrendsError::Decode(format!("timestamp out of range '{}'", secs)))?;

        Ok(TimelineRow {
            timestamp,
            values: self.value.into_iter().map(|v| v.min(100) as u8).collect(),
            has_data: self.has_data,
            is_partial: self.is_partial,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_guard() {
        assert_eq!(strip_guard(")]}',\n{\"a\":1}").unwrap(), "{\"a\":1}");
        assert_eq!(strip_guard("{}").unwrap(), "{}");
        assert!(matches!(strip_guard(")]}'"), Err(TrendsError::Decode(_))));
    }

    #[test]
    fn test_explore_request_shape() {
        let provider = GoogleTrends::new().with_category(7);
        let batch = KeywordBatch::new(vec!["Matcha".into(), "Cold Plunge".into()]).unwrap();
        let req = provider.explore_request(&batch, &RegionCode::worldwide(), TimeWindow::PastFiveYears);

        assert_eq!(req["category"], 7);
        assert_eq!(req["property"], "");
        let items = req["comparisonItem"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["keyword"], "Matcha");
        assert_eq!(items[1]["time"], "today 5-y");
        assert_eq!(items[1]["geo"], "");

        let us = provider.explore_request(&batch, &RegionCode::parse("US").unwrap(), TimeWindow::PastWeek);
        assert_eq!(us["comparisonItem"][0]["geo"], "US");
        assert_eq!(us["comparisonItem"][0]["time"], "now 7-d");
    }

    #[test]
    fn test_raw_row_parse() {
        let raw: RawRow = serde_json::from_str(
            r#"{"time":"1609459200","value":[42,140],"hasData":[true,true],"isPartial":true}"#,
        )
        .unwrap();
        let row = raw.into_row().unwrap();
        assert_eq!(row.timestamp.timestamp(), 1_609_459_200);
        assert_eq!(row.values, vec![42, 100]);
        assert!(row.is_partial);

        let bad: RawRow = serde_json::from_str(r#"{"time":"soon","value":[1]}"#).unwrap();
        assert!(matches!(bad.into_row(), Err(TrendsError::Decode(_))));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT + 3);
        assert_eq!(excerpt("  short  "), "short");
    }
}
