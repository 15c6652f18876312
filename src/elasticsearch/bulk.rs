//! Bulk indexing for the seed tool.

use anyhow::{Context, Result};
use elasticsearch::http::request::JsonBody;
use elasticsearch::BulkParts;
use tracing::{debug, warn};

use super::EsClient;
use crate::models::Hoarding;

/// Buffers hoardings and writes them in batches.
pub struct BulkIndexer {
    client: EsClient,
    batch_size: usize,
    buffer: Vec<Hoarding>,
    total_indexed: usize,
    total_errors: usize,
}

impl BulkIndexer {
    pub fn new(client: EsClient, batch_size: usize) -> Self {
        Self {
            client,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            total_indexed: 0,
            total_errors: 0,
        }
    }

    /// Queue a document, flushing once the batch is full.
    pub async fn add(&mut self, hoarding: Hoarding) -> Result<()> {
        self.buffer.push(hoarding);

        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }

        Ok(())
    }

    /// Write the buffered documents.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let docs = std::mem::take(&mut self.buffer);
        let count = docs.len();

        debug!("Flushing {} hoardings to Elasticsearch", count);

        let mut body: Vec<JsonBody<serde_json::Value>> = Vec::with_capacity(count * 2);
        for doc in &docs {
            body.push(
                serde_json::json!({
                    "index": {
                        "_id": &doc.id
                    }
                })
                .into(),
            );
            body.push(serde_json::to_value(doc)?.into());
        }

        let response = self
            .client
            .client()
            .bulk(BulkParts::Index(&self.client.index_name))
            .body(body)
            .send()
            .await
            .context("Bulk request failed")?;

        let response_body = response.json::<serde_json::Value>().await?;

        if response_body["errors"].as_bool().unwrap_or(false) {
            if let Some(items) = response_body["items"].as_array() {
                let error_count = items
                    .iter()
                    .filter(|item| item["index"]["error"].is_object())
                    .count();
                self.total_errors += error_count;
                warn!(
                    "Bulk request had {} errors out of {} documents",
                    error_count, count
                );
            }
        }

        self.total_indexed += count;
        self.buffer = Vec::with_capacity(self.batch_size);

        Ok(())
    }

    /// Flush the tail and return (indexed, errored) totals.
    pub async fn finish(mut self) -> Result<(usize, usize)> {
        self.flush().await?;
        Ok((self.total_indexed, self.total_errors))
    }

    pub fn stats(&self) -> (usize, usize) {
        (self.total_indexed, self.total_errors)
    }
}
