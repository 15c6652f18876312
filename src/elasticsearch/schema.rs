//! Index schema management.

use anyhow::{Context, Result};
use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts};
use tracing::info;

use super::EsClient;

/// Mapping JSON embedded at compile time.
const HOARDINGS_MAPPING: &str = include_str!("../../schema/hoardings_mapping.json");

/// Create the hoardings index with its mapping, including the geo_point
/// field the route queries depend on.
pub async fn create_index(client: &EsClient, delete_existing: bool) -> Result<()> {
    let es = client.client();
    let index_name = &client.index_name;

    let exists = es
        .indices()
        .exists(IndicesExistsParts::Index(&[index_name]))
        .send()
        .await?
        .status_code()
        .is_success();

    if exists {
        if delete_existing {
            info!("Deleting existing index: {}", index_name);
            es.indices()
                .delete(IndicesDeleteParts::Index(&[index_name]))
                .send()
                .await
                .context("Failed to delete existing index")?;
        } else {
            info!("Index {} already exists, skipping creation", index_name);
            return Ok(());
        }
    }

    let mapping: serde_json::Value =
        serde_json::from_str(HOARDINGS_MAPPING).context("Failed to parse hoardings_mapping.json")?;

    info!("Creating index: {}", index_name);
    let response = es
        .indices()
        .create(IndicesCreateParts::Index(index_name))
        .body(mapping)
        .send()
        .await
        .context("Failed to create index")?;

    if !response.status_code().is_success() {
        let error_body = response.text().await?;
        anyhow::bail!("Failed to create index: {}", error_body);
    }

    info!("Index {} created successfully", index_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_mapping_is_valid_json_with_geo_point() {
        let mapping: serde_json::Value = serde_json::from_str(HOARDINGS_MAPPING).unwrap();
        assert_eq!(
            mapping["mappings"]["properties"]["location"]["type"],
            "geo_point"
        );
        assert_eq!(mapping["mappings"]["dynamic"], "strict");
    }
}
