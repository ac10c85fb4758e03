//! Meter directory: which PRMs the account can read, and where they are.

use log::debug;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::TokenManager;
use crate::transport::{ApiRequest, Transport};

pub mod error;

use error::DirectoryError;

/// Postal address of a metering point, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeterAddress {
    pub number_street_name: String,
    pub postal_code_city: String,
    pub insee_code: String,
}

#[derive(Debug, Deserialize)]
struct PerimeterResponse {
    query_parameters: QueryParameters,
    usage_point_id: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryParameters {
    page_total_count: u32,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: MeterAddress,
}

/// Lists available metering points and resolves a PRM to its address.
pub struct MeterDirectory {
    transport: Arc<Transport>,
    tokens: Arc<TokenManager>,
    base_url: String,
}

impl MeterDirectory {
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

    /// Lists the PRMs visible in the account's perimeter.
    ///
    /// Multi-page perimeters are deliberately unsupported: silently returning
    /// the first page would hide meters, so a directory spanning more than
    /// one page fails with [`DirectoryError::MultiPageUnsupported`] naming
    /// the true page count.
    pub async fn meters(&self) -> Result<Vec<String>, DirectoryError> {
        let token = self.tokens.bearer().await?;
        let request = ApiRequest::post(format!(
            "{}/usage_point_id_perimeter/v1/usage_point_id",
            self.base_url
        ))
        .header("Accept", "application/json")
        .bearer(&token)
        .json(serde_json::json!({ "page_number": 1 }));

        let response = self.transport.send(&request).await?;
        let parsed: PerimeterResponse = response.json().map_err(DirectoryError::Parse)?;
        let pages = parsed.query_parameters.page_total_count;
        if pages > 1 {
            return Err(DirectoryError::MultiPageUnsupported { pages });
        }
        debug!("perimeter lists {} meter(s)", parsed.usage_point_id.len());
        Ok(parsed.usage_point_id)
    }

    /// Resolves a PRM to its postal address.
    pub async fn meter_address(&self, prm: &str) -> Result<MeterAddress, DirectoryError> {
        let token = self.tokens.bearer().await?;
        let request = ApiRequest::get(format!("{}/address/v1/{prm}", self.base_url))
            .header("Accept", "application/json")
            .bearer(&token);

        let response = self.transport.send(&request).await?;
        let parsed: AddressResponse = response.json().map_err(DirectoryError::Parse)?;
        Ok(parsed.address)
    }
}
