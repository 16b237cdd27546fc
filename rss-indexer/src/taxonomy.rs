//! Taxonomy files: JSON arrays of tag rows or tag set rows.

use crate::types::{Result, TagSetRow, TaxonomyRow};
use serde::de::DeserializeOwned;
use std::path::Path;

pub fn parse_tag_rows(json: &str) -> Result<Vec<TaxonomyRow>> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_tag_set_rows(json: &str) -> Result<Vec<TagSetRow>> {
    Ok(serde_json::from_str(json)?)
}

pub async fn load_tag_rows(path: impl AsRef<Path>) -> Result<Vec<TaxonomyRow>> {
    load(path).await
}

pub async fn load_tag_set_rows(path: impl AsRef<Path>) -> Result<Vec<TagSetRow>> {
    load(path).await
}

async fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}
