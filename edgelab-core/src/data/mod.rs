//! Price data: ingestion, validation, storage and providers.

pub mod cache;
pub mod ingest;
pub mod provider;
pub mod schema;
pub mod store;
pub mod synthetic;
pub mod yahoo;

pub use cache::{hash_bars, CacheMeta, ParquetCache};
pub use ingest::{read_price_csv, CsvProvider, IngestReport};
pub use provider::{DataError, DataSource, FetchError, FetchResult, PriceProvider};
pub use schema::{PriceSchema, SchemaError};
pub use store::{write_price_csv, DatasetStore};
pub use synthetic::{random_walk_bars, SyntheticProvider};
pub use yahoo::YahooProvider;
