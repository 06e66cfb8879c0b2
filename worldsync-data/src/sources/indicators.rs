//! Statistical-indicator adapter for the World Bank v2 API.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use worldsync_core::{CountryCode, IndicatorSnapshot};

use super::IndicatorSource;
use crate::http::{Fetch, HttpRequest};

/// Default World Bank endpoint.
pub const DEFAULT_INDICATOR_BASE_URL: &str = "https://api.worldbank.org/v2";

/// Endpoint of the indicator adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSourceConfig {
    /// API root without a trailing slash.
    pub base_url: String,
}

impl Default for IndicatorSourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDICATOR_BASE_URL.to_owned(),
        }
    }
}

impl IndicatorSourceConfig {
    /// Set the API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// A snapshot field and the indicator that feeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorField {
    /// `economy.gdp_per_capita`.
    GdpPerCapita,
    /// `economy.gdp_growth`.
    GdpGrowth,
    /// `economy.internet_penetration`.
    InternetPenetration,
    /// `demographics.urban_ratio`.
    UrbanRatio,
    /// `demographics.life_expectancy`.
    LifeExpectancy,
    /// `demographics.birth_rate`.
    BirthRate,
    /// `demographics.median_age`.
    MedianAge,
    /// `demographics.gender_ratio`.
    GenderRatio,
    /// `education.literacy_rate`.
    LiteracyRate,
}

impl IndicatorField {
    /// Every field, in request order.
    pub const ALL: [Self; 9] = [
        Self::GdpPerCapita,
        Self::GdpGrowth,
        Self::InternetPenetration,
        Self::UrbanRatio,
        Self::LifeExpectancy,
        Self::BirthRate,
        Self::MedianAge,
        Self::GenderRatio,
        Self::LiteracyRate,
    ];

    /// World Bank indicator code.
    #[must_use]
    pub const fn indicator_id(self) -> &'static str {
        match self {
            Self::GdpPerCapita => "NY.GDP.PCAP.CD",
            Self::GdpGrowth => "NY.GDP.MKTP.KD.ZG",
            Self::InternetPenetration => "IT.NET.USER.ZS",
            Self::UrbanRatio => "SP.URB.TOTL.IN.ZS",
            Self::LifeExpectancy => "SP.DYN.LE00.IN",
            Self::BirthRate => "SP.DYN.CBRT.IN",
            Self::MedianAge => "SP.POP.TOTL.MA.ZS",
            Self::GenderRatio => "SP.POP.BRTH.MF",
            Self::LiteracyRate => "SE.ADT.LITR.ZS",
        }
    }

    const fn assign(self, snapshot: &mut IndicatorSnapshot, value: f64) {
        let slot = match self {
            Self::GdpPerCapita => &mut snapshot.economy.gdp_per_capita,
            Self::GdpGrowth => &mut snapshot.economy.gdp_growth,
            Self::InternetPenetration => &mut snapshot.economy.internet_penetration,
            Self::UrbanRatio => &mut snapshot.demographics.urban_ratio,
            Self::LifeExpectancy => &mut snapshot.demographics.life_expectancy,
            Self::BirthRate => &mut snapshot.demographics.birth_rate,
            Self::MedianAge => &mut snapshot.demographics.median_age,
            Self::GenderRatio => &mut snapshot.demographics.gender_ratio,
            Self::LiteracyRate => &mut snapshot.education.literacy_rate,
        };
        *slot = Some(value);
    }
}

/// Issues one request per indicator and assembles the nested snapshot.
pub struct WorldBankSource {
    fetch: Arc<dyn Fetch>,
    config: IndicatorSourceConfig,
}

impl std::fmt::Debug for WorldBankSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldBankSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorldBankSource {
    /// Create the adapter.
    #[must_use]
    pub fn new(fetch: Arc<dyn Fetch>, config: IndicatorSourceConfig) -> Self {
        Self { fetch, config }
    }

    fn request(&self, code: &CountryCode, field: IndicatorField) -> HttpRequest {
        HttpRequest::new(format!(
            "{}/country/{code}/indicator/{}",
            self.config.base_url.trim_end_matches('/'),
            field.indicator_id()
        ))
        .param("format", "json")
        .param("per_page", "1")
    }

    fn fetch_field(&self, code: &CountryCode, field: IndicatorField) -> Option<f64> {
        let request = self.request(code, field);
        match self.fetch.get_json(&request) {
            Ok(payload) => latest_value(&payload).unwrap_or_else(|reason| {
                warn!("malformed payload from {}: {reason}", request.signature());
                None
            }),
            Err(err) => {
                warn!("indicator {} unavailable for {code}: {err}", field.indicator_id());
                None
            }
        }
    }
}

impl IndicatorSource for WorldBankSource {
    fn fetch(&self, code: &CountryCode) -> IndicatorSnapshot {
        let mut snapshot = IndicatorSnapshot::default();
        for field in IndicatorField::ALL {
            if let Some(value) = self.fetch_field(code, field) {
                field.assign(&mut snapshot, value);
            }
        }
        debug!("fetched indicators for {code}: {snapshot:?}");
        snapshot
    }
}

/// Extract `[1][0].value`.
///
/// A `[message]` array, an empty or missing page and a `null` value all mean
/// the indicator is unavailable. Anything that is not an array is malformed.
fn latest_value(payload: &Value) -> Result<Option<f64>, String> {
    let Some(pages) = payload.as_array() else {
        return Err("expected a [metadata, rows] array".to_owned());
    };
    let Some(value) = pages
        .get(1)
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
        .and_then(|row| row.get("value"))
    else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => Ok(number.as_f64()),
        other => Err(format!("expected a numeric value, found {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{StubFetch, StubReply};
    use rstest::rstest;
    use serde_json::json;

    fn url(code: &str, field: IndicatorField) -> String {
        format!(
            "https://api.worldbank.org/v2/country/{code}/indicator/{}?format=json&per_page=1",
            field.indicator_id()
        )
    }

    fn page(value: Value) -> Value {
        json!([{"page": 1, "pages": 1, "per_page": 1, "total": 64},
               [{"indicator": {"id": "X"}, "date": "2022", "value": value}]])
    }

    #[rstest]
    #[case::value(page(json!(41.5)), Ok(Some(41.5)))]
    #[case::null(page(Value::Null), Ok(None))]
    #[case::message(json!([{"message": [{"id": "120", "value": "Invalid value"}]}]), Ok(None))]
    #[case::empty_page(json!([{"page": 0}, []]), Ok(None))]
    #[case::missing_page(json!([{"page": 0}, null]), Ok(None))]
    fn latest_value_reads_the_first_row(
        #[case] payload: Value,
        #[case] expected: Result<Option<f64>, String>,
    ) {
        assert_eq!(latest_value(&payload), expected);
    }

    #[rstest]
    fn objects_are_malformed() {
        assert!(latest_value(&json!({"value": 1})).is_err());
    }

    #[rstest]
    fn failed_indicators_leave_their_field_empty() {
        let stub = StubFetch::new()
            .with_json(url("GB", IndicatorField::GdpPerCapita), page(json!(46_125.3)))
            .with_json(url("GB", IndicatorField::BirthRate), page(json!(10.1)))
            .with_json(url("GB", IndicatorField::LiteracyRate), page(json!(99.0)))
            .with_reply(url("GB", IndicatorField::UrbanRatio), StubReply::Transient)
            .with_json(url("GB", IndicatorField::LifeExpectancy), json!("oops"));
        let source = WorldBankSource::new(Arc::new(stub), IndicatorSourceConfig::default());
        let code = CountryCode::parse("GB").expect("code");

        let snapshot = source.fetch(&code);

        assert_eq!(snapshot.economy.gdp_per_capita, Some(46_125.3));
        assert_eq!(snapshot.economy.gdp_growth, None);
        assert_eq!(snapshot.demographics.birth_rate, Some(10.1));
        assert_eq!(snapshot.demographics.urban_ratio, None);
        assert_eq!(snapshot.demographics.life_expectancy, None);
        assert_eq!(snapshot.education.literacy_rate, Some(99.0));
    }

    #[rstest]
    fn every_indicator_is_requested_once() {
        let stub = Arc::new(StubFetch::new());
        let source = WorldBankSource::new(stub.clone(), IndicatorSourceConfig::default());
        let code = CountryCode::parse("GB").expect("code");

        assert!(source.fetch(&code).is_empty());
        assert_eq!(stub.requests().len(), IndicatorField::ALL.len());
    }
}
