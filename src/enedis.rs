//! Main entry point for the Enedis entreprises API client.
//!
//! [`Enedis`] bundles the token manager, the meter directory and the
//! metering-data fetcher behind one explicitly constructed facade. The
//! transport and base URL are injectable so tests (and on-premise proxies)
//! can substitute them; nothing in this crate reaches for process-global
//! state.

use bon::bon;
use std::sync::Arc;

use crate::auth::{Credentials, TokenManager};
use crate::directory::{MeterAddress, MeterDirectory};
use crate::error::EnedisError;
use crate::metering::date_input::DateInput;
use crate::metering::{EnergySeries, MeteringDataFetcher};
use crate::transport::Transport;

/// Production endpoint of the Enedis entreprises API.
pub const BASE_URL: &str = "https://ext.prod.api.enedis.fr:443";

/// Client for the Enedis entreprises metering-data API.
///
/// All calls authenticate with the OAuth2 client-credentials grant; the
/// bearer token is cached and refreshed transparently. Requests go through a
/// retry-hardened transport sharing one connection pool.
///
/// # Examples
///
/// ```no_run
/// use enedis_data::{Credentials, Enedis, EnedisError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), EnedisError> {
///     let client = Enedis::builder()
///         .credentials(Credentials::from_env()?)
///         .build();
///
///     for prm in client.meters().await? {
///         let address = client.meter_address(&prm).await?;
///         println!("{prm}: {}", address.postal_code_city);
///     }
///     Ok(())
/// }
/// ```
pub struct Enedis {
    directory: MeterDirectory,
    metering: MeteringDataFetcher,
}

#[bon]
impl Enedis {
    /// Builds a client.
    ///
    /// * `credentials` - API client id and secret (required).
    /// * `base_url` - Overrides [`BASE_URL`], mainly for tests and proxies.
    /// * `transport` - Injects a transport with a custom retry policy or
    ///   timeout; defaults to [`Transport::new`].
    #[builder]
    pub fn new(
        credentials: Credentials,
        base_url: Option<String>,
        transport: Option<Transport>,
    ) -> Self {
        let base_url = base_url.unwrap_or_else(|| BASE_URL.to_string());
        let transport = Arc::new(transport.unwrap_or_default());
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&transport),
            base_url.clone(),
            credentials,
        ));
        Self {
            directory: MeterDirectory::new(
                Arc::clone(&transport),
                Arc::clone(&tokens),
                base_url.clone(),
            ),
            metering: MeteringDataFetcher::new(transport, tokens, base_url),
        }
    }

    /// Lists the PRMs visible in the account's perimeter.
    ///
    /// # Errors
    ///
    /// Fails with [`DirectoryError::MultiPageUnsupported`] when the perimeter
    /// spans more than one page, naming the true page count.
    ///
    /// [`DirectoryError::MultiPageUnsupported`]: crate::DirectoryError::MultiPageUnsupported
    pub async fn meters(&self) -> Result<Vec<String>, EnedisError> {
        Ok(self.directory.meters().await?)
    }

    /// Resolves a PRM to its postal address.
    pub async fn meter_address(&self, prm: &str) -> Result<MeterAddress, EnedisError> {
        Ok(self.directory.meter_address(prm).await?)
    }

    /// Daily consumption in Wh over `[start, end)`.
    ///
    /// `start` and `end` accept ISO strings, [`chrono::NaiveDate`] or
    /// [`chrono::NaiveDateTime`] (see [`DateInput`]). Per the provider's
    /// documentation, `start` may reach at most 36 months back and `end`
    /// must be at least 15 days before now; those limits are the caller's
    /// to respect.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use enedis_data::{Credentials, Enedis, EnedisError};
    /// # async fn run(client: Enedis) -> Result<(), EnedisError> {
    /// let series = client
    ///     .daily_consumption("11111111111111", "2024-01-01", "2024-02-01")
    ///     .await?;
    /// for point in series.iter() {
    ///     println!("{}: {} Wh", point.timestamp, point.value_wh);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn daily_consumption(
        &self,
        prm: &str,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
    ) -> Result<EnergySeries, EnedisError> {
        Ok(self.metering.daily_consumption(prm, start, end).await?)
    }

    /// Daily production in Wh over `[start, end)`. Same limits as
    /// [`daily_consumption`](Self::daily_consumption).
    pub async fn daily_production(
        &self,
        prm: &str,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
    ) -> Result<EnergySeries, EnedisError> {
        Ok(self.metering.daily_production(prm, start, end).await?)
    }

    /// Half-hourly production in Wh over `[start, end)`.
    ///
    /// The window may span at most 7 days; longer spans are rejected before
    /// any request is sent. An empty response is an error for this endpoint.
    pub async fn half_hourly_production(
        &self,
        prm: &str,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
    ) -> Result<EnergySeries, EnedisError> {
        Ok(self.metering.half_hourly_production(prm, start, end).await?)
    }
}
