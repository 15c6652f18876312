//! Elasticsearch client, schema and document store.

mod bulk;
mod client;
mod schema;
mod store;

pub use bulk::BulkIndexer;
pub use client::EsClient;
pub use schema::create_index;
pub use store::{HoardingStore, ListParams};
