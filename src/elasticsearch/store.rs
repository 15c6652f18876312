//! Document store for hoardings.
//!
//! Writes go through with `refresh=wait_for` so a create or update is
//! visible to the very next search; route queries lean on the index's
//! geo_point field for distance and bounding-box filtering.

use anyhow::{Context, Result};
use async_trait::async_trait;
use elasticsearch::params::Refresh;
use elasticsearch::{DeleteParts, GetParts, IndexParts, SearchParts};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::EsClient;
use crate::geo::GeoQueryStore;
use crate::models::{GeoPoint, Hoarding, HoardingSummary};

/// Upper bound on hits returned by a single geo query.
const GEO_RESULT_LIMIT: usize = 500;

/// `_source` projection for list views.
const SUMMARY_FIELDS: &[&str] = &["id", "name", "imageUrl", "address", "status", "location"];

/// Paged listing parameters.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub page: usize,
    pub per_page: usize,
    pub text: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            text: None,
        }
    }
}

#[derive(Clone)]
pub struct HoardingStore {
    client: EsClient,
}

impl HoardingStore {
    pub fn new(client: EsClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &EsClient {
        &self.client
    }

    /// Index the full document under its id, replacing any previous
    /// version. Used for both create and update.
    pub async fn save(&self, hoarding: &Hoarding) -> Result<()> {
        let response = self
            .client
            .client()
            .index(IndexParts::IndexId(&self.client.index_name, &hoarding.id))
            .refresh(Refresh::WaitFor)
            .body(serde_json::to_value(hoarding)?)
            .send()
            .await
            .context("Index request failed")?;

        if !response.status_code().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to index hoarding {}: {}", hoarding.id, error_body);
        }

        Ok(())
    }

    /// Fetch one document by id.
    pub async fn get(&self, id: &str) -> Result<Option<Hoarding>> {
        let response = self
            .client
            .client()
            .get(GetParts::IndexId(&self.client.index_name, id))
            .send()
            .await
            .context("Get request failed")?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status_code().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to fetch hoarding {}: {}", id, error_body);
        }

        let body = response.json::<serde_json::Value>().await?;
        if !body["found"].as_bool().unwrap_or(false) {
            return Ok(None);
        }

        let hoarding = serde_json::from_value(body["_source"].clone())
            .context("Stored hoarding document did not match the expected shape")?;
        Ok(Some(hoarding))
    }

    /// Delete one document by id. Returns false when it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let response = self
            .client
            .client()
            .delete(DeleteParts::IndexId(&self.client.index_name, id))
            .refresh(Refresh::WaitFor)
            .send()
            .await
            .context("Delete request failed")?;

        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }
        if !response.status_code().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to delete hoarding {}: {}", id, error_body);
        }

        Ok(true)
    }

    /// Paged listing, newest first, projected down to the summary fields.
    /// An optional free-text term searches name, address and notes.
    pub async fn list(&self, params: &ListParams) -> Result<(Vec<HoardingSummary>, u64)> {
        let body = list_query_body(params);
        debug!("List query: {}", body);

        let response = self
            .client
            .client()
            .search(SearchParts::Index(&[&self.client.index_name]))
            .body(body)
            .send()
            .await
            .context("List search failed")?;

        if !response.status_code().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to list hoardings: {}", error_body);
        }

        let body = response.json::<serde_json::Value>().await?;
        let total = body["hits"]["total"]["value"].as_u64().unwrap_or(0);
        Ok((parse_hits(&body), total))
    }

    async fn geo_search(&self, body: serde_json::Value) -> Result<Vec<Hoarding>> {
        debug!("Geo query: {}", body);

        let response = self
            .client
            .client()
            .search(SearchParts::Index(&[&self.client.index_name]))
            .body(body)
            .send()
            .await
            .context("Geo search failed")?;

        if !response.status_code().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Geo search failed: {}", error_body);
        }

        let body = response.json::<serde_json::Value>().await?;
        Ok(parse_hits(&body))
    }
}

#[async_trait]
impl GeoQueryStore for HoardingStore {
    async fn find_near(&self, center: GeoPoint, radius_meters: f64) -> Result<Vec<Hoarding>> {
        self.geo_search(near_query_body(center, radius_meters, GEO_RESULT_LIMIT))
            .await
    }

    async fn find_within_box(&self, min: GeoPoint, max: GeoPoint) -> Result<Vec<Hoarding>> {
        self.geo_search(box_query_body(min, max, GEO_RESULT_LIMIT))
            .await
    }
}

/// Distance filter plus distance sort: everything inside the circle,
/// nearest first.
fn near_query_body(center: GeoPoint, radius_meters: f64, limit: usize) -> serde_json::Value {
    json!({
        "query": {
            "bool": {
                "filter": [
                    {
                        "geo_distance": {
                            "distance": format!("{}m", radius_meters),
                            "location": { "lat": center.lat, "lon": center.lon }
                        }
                    }
                ]
            }
        },
        "sort": [
            {
                "_geo_distance": {
                    "location": { "lat": center.lat, "lon": center.lon },
                    "order": "asc",
                    "unit": "m"
                }
            }
        ],
        "size": limit
    })
}

/// Closed-rectangle filter; the bounds themselves match. No ordering.
fn box_query_body(min: GeoPoint, max: GeoPoint, limit: usize) -> serde_json::Value {
    json!({
        "query": {
            "bool": {
                "filter": [
                    {
                        "geo_bounding_box": {
                            "location": {
                                "top_left": { "lon": min.lon, "lat": max.lat },
                                "bottom_right": { "lon": max.lon, "lat": min.lat }
                            }
                        }
                    }
                ]
            }
        },
        "size": limit
    })
}

fn list_query_body(params: &ListParams) -> serde_json::Value {
    let page = params.page.max(1);
    let query = match params.text.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(text) => json!({
            "multi_match": {
                "query": text,
                "fields": ["name", "address", "notes"]
            }
        }),
        None => json!({ "match_all": {} }),
    };

    json!({
        "query": query,
        "sort": [
            { "createdAt": { "order": "desc" } }
        ],
        "from": (page - 1) * params.per_page,
        "size": params.per_page,
        "_source": SUMMARY_FIELDS,
        "track_total_hits": true
    })
}

/// Pull typed documents out of a search response, dropping any hit whose
/// `_source` no longer matches the expected shape.
fn parse_hits<T: DeserializeOwned>(body: &serde_json::Value) -> Vec<T> {
    body["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| serde_json::from_value(hit["_source"].clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_query_filters_and_sorts_by_distance() {
        let body = near_query_body(
            GeoPoint {
                lon: 78.989,
                lat: 17.708,
            },
            15_000.0,
            500,
        );
        let filter = &body["query"]["bool"]["filter"][0]["geo_distance"];
        assert_eq!(filter["distance"], "15000m");
        assert_eq!(filter["location"]["lon"], 78.989);
        assert_eq!(body["sort"][0]["_geo_distance"]["order"], "asc");
        assert_eq!(body["sort"][0]["_geo_distance"]["unit"], "m");
    }

    #[test]
    fn box_query_maps_min_max_onto_corners() {
        let min = GeoPoint {
            lon: 78.384,
            lat: 17.447,
        };
        let max = GeoPoint {
            lon: 79.5941,
            lat: 17.9689,
        };
        let body = box_query_body(min, max, 500);
        let bbox = &body["query"]["bool"]["filter"][0]["geo_bounding_box"]["location"];
        assert_eq!(bbox["top_left"]["lon"], 78.384);
        assert_eq!(bbox["top_left"]["lat"], 17.9689);
        assert_eq!(bbox["bottom_right"]["lon"], 79.5941);
        assert_eq!(bbox["bottom_right"]["lat"], 17.447);
        assert!(body["sort"].is_null());
    }

    #[test]
    fn list_query_pages_and_projects() {
        let body = list_query_body(&ListParams {
            page: 3,
            per_page: 20,
            text: None,
        });
        assert_eq!(body["from"], 40);
        assert_eq!(body["size"], 20);
        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(body["_source"][1], "name");
    }

    #[test]
    fn list_query_searches_text_fields_when_given_a_term() {
        let body = list_query_body(&ListParams {
            page: 1,
            per_page: 50,
            text: Some("ring road".to_string()),
        });
        assert_eq!(body["query"]["multi_match"]["query"], "ring road");
    }

    #[test]
    fn parse_hits_skips_malformed_sources() {
        let body = json!({
            "hits": {
                "hits": [
                    { "_source": { "id": "a", "location": { "type": "Point", "coordinates": [78.4, 17.45] } } },
                    { "_source": { "id": 42 } }
                ]
            }
        });
        let summaries: Vec<HoardingSummary> = parse_hits(&body);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "a");
    }
}
