//! Metering-data retrieval and normalization.
//!
//! Three endpoints share one payload family: `meter_reading.interval_reading`
//! is a list of `{date, value}` records. Daily endpoints report one reading
//! per day; the production load curve reports one per half hour and may use
//! the three-phase shape, where `value` is a list of per-phase readings and
//! `date` a list whose first element carries the timestamp. Everything is
//! normalized into an [`EnergySeries`] of timezone-aware Europe/Paris points
//! in watt-hours.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use log::debug;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::TokenManager;
use crate::transport::{ApiRequest, Transport};

pub mod date_input;
pub mod error;
mod localize;

use date_input::DateInput;
use error::MeteringError;

pub use localize::TIMEZONE;

/// Longest allowed load-curve window, end exclusive.
const MAX_LOAD_CURVE_SPAN_DAYS: i64 = 7;

/// Which quantity a series measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    ConsumptionWh,
    ProductionWh,
}

/// One timestamped energy reading, in watt-hours.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Tz>,
    pub value_wh: f64,
}

/// An ordered series of readings as received from the provider.
///
/// Daily series may legitimately be empty; half-hourly production may not
/// (an empty load-curve response is [`MeteringError::NoData`]).
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySeries {
    pub measurement: Measurement,
    pub points: Vec<SeriesPoint>,
}

impl EnergySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SeriesPoint> {
        self.points.iter()
    }
}

#[derive(Debug, Deserialize)]
struct MeterReadingResponse {
    meter_reading: MeterReading,
}

#[derive(Debug, Deserialize)]
struct MeterReading {
    interval_reading: Vec<IntervalReading>,
}

/// The provider reports values as JSON numbers or numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Number(f64),
    Text(String),
}

impl RawScalar {
    fn as_wh(&self) -> Result<f64, MeteringError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(text) => {
                text.trim()
                    .parse()
                    .map_err(|_| MeteringError::Value { text: text.clone() })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Single(RawScalar),
    PerPhase(Vec<RawScalar>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDate {
    Single(String),
    PerPhase(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct IntervalReading {
    date: RawDate,
    value: RawValue,
}

impl IntervalReading {
    /// Wall-clock timestamp; the three-phase shape carries it in the first
    /// element of the `date` list.
    fn timestamp(&self) -> Result<NaiveDateTime, MeteringError> {
        let text = match &self.date {
            RawDate::Single(text) => text.as_str(),
            RawDate::PerPhase(list) => list
                .first()
                .map(String::as_str)
                .ok_or(MeteringError::Timestamp {
                    text: String::new(),
                })?,
        };
        parse_naive_timestamp(text)
    }

    /// Reading in watt-hours; per-phase values are summed into one total.
    fn value_wh(&self) -> Result<f64, MeteringError> {
        match &self.value {
            RawValue::Single(scalar) => scalar.as_wh(),
            RawValue::PerPhase(phases) => {
                phases.iter().map(RawScalar::as_wh).sum::<Result<f64, _>>()
            }
        }
    }
}

fn parse_naive_timestamp(text: &str) -> Result<NaiveDateTime, MeteringError> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(datetime);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(MeteringError::Timestamp {
        text: text.to_string(),
    })
}

/// Retrieves daily and half-hourly series for a PRM and date range.
pub struct MeteringDataFetcher {
    transport: Arc<Transport>,
    tokens: Arc<TokenManager>,
    base_url: String,
}

impl MeteringDataFetcher {
    pub fn new(
        transport: Arc<Transport>,
        tokens: Arc<TokenManager>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            tokens,
            base_url: base_url.into(),
        }
    }

    /// Daily consumption in Wh over `[start, end)`.
    ///
    /// Provider-documented limits, enforced by the caller rather than here:
    /// `start` at most 36 months in the past, `end` at least 15 days before
    /// now.
    pub async fn daily_consumption(
        &self,
        prm: &str,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
    ) -> Result<EnergySeries, MeteringError> {
        self.daily(
            prm,
            start.into(),
            end.into(),
            "daily_consumption",
            Measurement::ConsumptionWh,
        )
        .await
    }

    /// Daily production in Wh over `[start, end)`. Same documented limits as
    /// [`daily_consumption`](Self::daily_consumption).
    pub async fn daily_production(
        &self,
        prm: &str,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
    ) -> Result<EnergySeries, MeteringError> {
        self.daily(
            prm,
            start.into(),
            end.into(),
            "daily_production",
            Measurement::ProductionWh,
        )
        .await
    }

    async fn daily(
        &self,
        prm: &str,
        start: DateInput,
        end: DateInput,
        endpoint: &str,
        measurement: Measurement,
    ) -> Result<EnergySeries, MeteringError> {
        let start = start.normalize()?;
        let end = end.normalize()?;
        let readings = self.fetch_interval_readings(prm, start, end, endpoint).await?;

        let mut points = Vec::with_capacity(readings.len());
        for reading in &readings {
            let timestamp = localize::localize_strict(reading.timestamp()?)?;
            points.push(SeriesPoint {
                timestamp,
                value_wh: reading.value_wh()?,
            });
        }
        debug!("fetched {} {endpoint} reading(s) for PRM {prm}", points.len());
        Ok(EnergySeries {
            measurement,
            points,
        })
    }

    /// Half-hourly production in Wh over `[start, end)`.
    ///
    /// The window may span at most 7 days (exactly 7 is accepted); longer
    /// spans are rejected before any request is sent. An empty response is an
    /// error for this endpoint: a load curve with no readings means the
    /// period holds no data.
    pub async fn half_hourly_production(
        &self,
        prm: &str,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
    ) -> Result<EnergySeries, MeteringError> {
        let start = start.into().normalize()?;
        let end = end.into().normalize()?;
        if end > start + Duration::days(MAX_LOAD_CURVE_SPAN_DAYS) {
            return Err(MeteringError::SpanTooLong { start, end });
        }

        let readings = self
            .fetch_interval_readings(prm, start, end, "production_load_curve")
            .await?;
        if readings.is_empty() {
            return Err(MeteringError::NoData { start, end });
        }

        let mut points = Vec::with_capacity(readings.len());
        let mut previous: Option<DateTime<Tz>> = None;
        for reading in &readings {
            let timestamp = localize::localize_inferred(reading.timestamp()?, previous.as_ref())?;
            points.push(SeriesPoint {
                timestamp: timestamp.clone(),
                value_wh: reading.value_wh()?,
            });
            previous = Some(timestamp);
        }
        debug!(
            "fetched {} load-curve reading(s) for PRM {prm} ({start} to {end})",
            points.len()
        );
        Ok(EnergySeries {
            measurement: Measurement::ProductionWh,
            points,
        })
    }

    async fn fetch_interval_readings(
        &self,
        prm: &str,
        start: NaiveDate,
        end: NaiveDate,
        endpoint: &str,
    ) -> Result<Vec<IntervalReading>, MeteringError> {
        let token = self.tokens.bearer().await?;
        let request = ApiRequest::get(format!(
            "{}/mesures/v1/metering_data/{endpoint}",
            self.base_url
        ))
        .query("usage_point_id", prm)
        .query("start", start.to_string())
        .query("end", end.to_string())
        .header("Accept", "application/json")
        .bearer(&token);

        let response = self.transport.send(&request).await?;
        let parsed: MeterReadingResponse = response.json().map_err(MeteringError::Parse)?;
        Ok(parsed.meter_reading.interval_reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(base_url: String) -> MeteringDataFetcher {
        let transport = Arc::new(Transport::new());
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&transport),
            base_url.clone(),
            Credentials::new("id", "secret"),
        ));
        MeteringDataFetcher::new(transport, tokens, base_url)
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth2/v3/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": 3600,
            })))
            .mount(server)
            .await;
    }

    fn reading(json: serde_json::Value) -> IntervalReading {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn three_phase_values_are_summed() {
        let reading = reading(serde_json::json!({
            "date": ["2024-03-01 00:30:00", "2024-03-01 00:30:00", "2024-03-01 00:30:00"],
            "value": [10.0, 20.0, 5.0],
        }));
        assert_eq!(reading.value_wh().unwrap(), 35.0);
        assert_eq!(
            reading.timestamp().unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn string_values_parse_as_wh() {
        let reading = reading(serde_json::json!({
            "date": "2024-03-01",
            "value": "1234",
        }));
        assert_eq!(reading.value_wh().unwrap(), 1234.0);
    }

    #[test]
    fn unparseable_value_is_a_typed_error() {
        let reading = reading(serde_json::json!({
            "date": "2024-03-01",
            "value": "12a4",
        }));
        assert!(matches!(
            reading.value_wh().unwrap_err(),
            MeteringError::Value { .. }
        ));
    }

    #[tokio::test]
    async fn span_longer_than_7_days_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        let fetcher = fetcher(server.uri());

        let err = fetcher
            .half_hourly_production("11111111111111", "2024-03-01", "2024-03-09")
            .await
            .unwrap_err();
        assert!(matches!(err, MeteringError::SpanTooLong { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn span_of_exactly_7_days_is_accepted() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/mesures/v1/metering_data/production_load_curve"))
            .and(query_param("usage_point_id", "11111111111111"))
            .and(query_param("start", "2024-03-01"))
            .and(query_param("end", "2024-03-08"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meter_reading": {
                    "interval_reading": [
                        { "date": "2024-03-01 00:30:00", "value": 120 },
                        { "date": "2024-03-01 01:00:00", "value": "150" },
                    ],
                },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let series = fetcher(server.uri())
            .half_hourly_production("11111111111111", "2024-03-01", "2024-03-08")
            .await
            .unwrap();
        assert_eq!(series.measurement, Measurement::ProductionWh);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0].value_wh, 120.0);
        assert_eq!(series.points[1].value_wh, 150.0);
        assert_eq!(
            series.points[0].timestamp.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn empty_load_curve_is_an_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/mesures/v1/metering_data/production_load_curve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meter_reading": { "interval_reading": [] },
            })))
            .mount(&server)
            .await;

        let err = fetcher(server.uri())
            .half_hourly_production("11111111111111", "2024-03-01", "2024-03-02")
            .await
            .unwrap_err();
        assert!(matches!(err, MeteringError::NoData { .. }));
    }

    #[tokio::test]
    async fn empty_daily_series_is_valid() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/mesures/v1/metering_data/daily_consumption"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meter_reading": { "interval_reading": [] },
            })))
            .mount(&server)
            .await;

        let series = fetcher(server.uri())
            .daily_consumption("11111111111111", "2024-03-01", "2024-03-10")
            .await
            .unwrap();
        assert_eq!(series.measurement, Measurement::ConsumptionWh);
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn daily_readings_localize_to_paris_midnight() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/mesures/v1/metering_data/daily_production"))
            .and(query_param("start", "2024-01-01"))
            .and(query_param("end", "2024-01-03"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meter_reading": {
                    "interval_reading": [
                        { "date": "2024-01-01", "value": "5500" },
                        { "date": "2024-01-02", "value": "6100" },
                    ],
                },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let series = fetcher(server.uri())
            .daily_production(
                "11111111111111",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        // Paris midnight in winter is 23:00 UTC the previous day.
        assert_eq!(
            series.points[0].timestamp.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap()
        );
        assert_eq!(series.points[1].value_wh, 6100.0);
    }

    #[tokio::test]
    async fn daily_ambiguous_wall_time_fails_strict_localization() {
        // The daily endpoints apply no disambiguation rule, unlike the load
        // curve. 02:30 on the fall-back day is ambiguous and must error.
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/mesures/v1/metering_data/daily_consumption"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meter_reading": {
                    "interval_reading": [
                        { "date": "2023-10-29 02:30:00", "value": 1000 },
                    ],
                },
            })))
            .mount(&server)
            .await;

        let err = fetcher(server.uri())
            .daily_consumption("11111111111111", "2023-10-29", "2023-10-30")
            .await
            .unwrap_err();
        assert!(matches!(err, MeteringError::AmbiguousLocalTime { .. }));
    }

    #[tokio::test]
    async fn load_curve_crossing_fall_back_localizes_in_order() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/mesures/v1/metering_data/production_load_curve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meter_reading": {
                    "interval_reading": [
                        { "date": "2023-10-29 01:30:00", "value": 10 },
                        { "date": "2023-10-29 02:00:00", "value": 20 },
                        { "date": "2023-10-29 02:30:00", "value": 30 },
                        { "date": "2023-10-29 02:00:00", "value": 40 },
                        { "date": "2023-10-29 02:30:00", "value": 50 },
                        { "date": "2023-10-29 03:00:00", "value": 60 },
                    ],
                },
            })))
            .mount(&server)
            .await;

        let series = fetcher(server.uri())
            .half_hourly_production("11111111111111", "2023-10-29", "2023-10-30")
            .await
            .unwrap();
        let instants: Vec<_> = series
            .iter()
            .map(|p| p.timestamp.with_timezone(&Utc))
            .collect();
        assert!(instants.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(
            instants.first().copied().unwrap(),
            Utc.with_ymd_and_hms(2023, 10, 28, 23, 30, 0).unwrap()
        );
        assert_eq!(
            instants.last().copied().unwrap(),
            Utc.with_ymd_and_hms(2023, 10, 29, 2, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn non_2xx_metering_response_surfaces_transport_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/mesures/v1/metering_data/daily_consumption"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = fetcher(server.uri())
            .daily_consumption("11111111111111", "2024-03-01", "2024-03-02")
            .await
            .unwrap_err();
        match err {
            MeteringError::Transport(transport) => assert_eq!(transport.status(), Some(403)),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
