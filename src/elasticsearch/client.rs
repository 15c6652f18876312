//! Elasticsearch client wrapper.

use anyhow::Result;
use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch,
};
use url::Url;

/// Connection handle bound to the hoardings index.
#[derive(Clone)]
pub struct EsClient {
    client: Elasticsearch,
    pub index_name: String,
}

impl EsClient {
    /// Connect to a single-node cluster.
    pub async fn connect(es_url: &str, index_name: &str) -> Result<Self> {
        let url = Url::parse(es_url)?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool).disable_proxy().build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index_name: index_name.to_string(),
        })
    }

    /// The underlying Elasticsearch client.
    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Check whether the cluster answers at all.
    pub async fn is_healthy(&self) -> Result<bool> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await?;

        Ok(response.status_code().is_success())
    }

    /// Number of documents currently in the index.
    pub async fn doc_count(&self) -> Result<u64> {
        let response = self
            .client
            .count(elasticsearch::CountParts::Index(&[&self.index_name]))
            .send()
            .await?;

        let body = response.json::<serde_json::Value>().await?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }
}
