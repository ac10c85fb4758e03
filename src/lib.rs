mod auth;
mod decrypt;
mod directory;
mod enedis;
mod error;
mod metering;
mod transport;

pub use error::EnedisError;

pub use enedis::{Enedis, BASE_URL};

pub use auth::error::AuthError;
pub use auth::{AccessToken, Credentials, TokenManager};

pub use directory::error::DirectoryError;
pub use directory::{MeterAddress, MeterDirectory};

pub use metering::date_input::DateInput;
pub use metering::error::MeteringError;
pub use metering::{EnergySeries, Measurement, MeteringDataFetcher, SeriesPoint, TIMEZONE};

pub use transport::error::TransportError;
pub use transport::{ApiRequest, ApiResponse, RequestBody, RetryPolicy, Transport};

pub use decrypt::decrypt_file;
pub use decrypt::error::DecryptError;
