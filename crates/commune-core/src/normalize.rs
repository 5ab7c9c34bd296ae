//! Response normalization boundary.
//!
//! The backend is inconsistent about response shapes: lists arrive bare or
//! wrapped (`{items, pagination}`, `{data: [...]}`, `{posts: [...]}`), single
//! items arrive bare or wrapped, and the upload endpoint answers with either
//! `imageUrl` or `url`. Everything is mapped to one canonical shape here and
//! nothing past this module branches on response shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::ApiError;
use crate::models::Resource;

const LIST_KEYS: [&str; 4] = ["items", "data", "results", "rows"];
const ITEM_KEYS: [&str; 2] = ["data", "item"];
const UPLOAD_URL_KEYS: [&str; 2] = ["imageUrl", "url"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 0,
            total: 0,
            pages: 0,
        }
    }
}

impl Pagination {
    /// Pagination for an unpaginated response holding `len` items.
    #[must_use]
    pub fn single_page(len: usize) -> Self {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        Self {
            page: 1,
            limit: len,
            total: u64::from(len),
            pages: u32::from(len > 0),
        }
    }

    fn completed(mut self, len: usize) -> Self {
        if self.total == 0 && len > 0 {
            self.total = u64::try_from(len).unwrap_or(u64::MAX);
        }
        if self.pages == 0 && self.limit > 0 {
            self.pages = u32::try_from(self.total.div_ceil(u64::from(self.limit))).unwrap_or(u32::MAX);
        }
        self
    }
}

/// One page of a collection in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub pagination: Pagination,
}

impl<R> Page<R> {
    pub fn from_items(items: Vec<R>) -> Self {
        let pagination = Pagination::single_page(items.len());
        Self { items, pagination }
    }
}

pub fn normalize_list<R: Resource>(value: Value) -> Result<Page<R>, ApiError> {
    match value {
        Value::Array(items) => Ok(Page::from_items(decode_items(items)?)),
        Value::Object(mut fields) => {
            let collection_key = R::KIND.path_segment();
            let key = LIST_KEYS
                .iter()
                .copied()
                .chain(std::iter::once(collection_key))
                .find(|key| fields.get(*key).is_some_and(Value::is_array));

            if let Some(Value::Array(items)) = key.and_then(|key| fields.remove(key)) {
                let items = decode_items(items)?;
                let pagination = extract_pagination(&fields)?.completed(items.len());
                return Ok(Page { items, pagination });
            }

            // `{data: {items: [...], pagination: {...}}}`
            if let Some(inner @ Value::Object(_)) = fields.remove("data") {
                return normalize_list(inner);
            }

            Err(ApiError::InvalidPayload(format!(
                "list response for {collection_key} did not contain an array"
            )))
        }
        Value::Null => Ok(Page::from_items(Vec::new())),
        other => Err(ApiError::InvalidPayload(format!(
            "unexpected list response: {other}"
        ))),
    }
}

pub fn normalize_item<R: Resource>(value: Value) -> Result<R, ApiError> {
    let Value::Object(mut fields) = value else {
        return Err(ApiError::InvalidPayload(
            "item response was not a JSON object".to_string(),
        ));
    };

    if !fields.contains_key("id") {
        let key = ITEM_KEYS
            .iter()
            .copied()
            .chain(std::iter::once(R::KIND.singular()))
            .find(|key| fields.get(*key).is_some_and(Value::is_object));
        if let Some(key) = key {
            let inner = fields.remove(key).unwrap_or(Value::Null);
            return normalize_item(inner);
        }
    }

    decode(Value::Object(fields))
}

/// Extract the canonical remote URL from an upload response.
pub fn normalize_upload_url(value: &Value) -> Result<String, ApiError> {
    let find = |fields: &Map<String, Value>| {
        UPLOAD_URL_KEYS.iter().find_map(|key| {
            fields
                .get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(ToString::to_string)
        })
    };

    let Value::Object(fields) = value else {
        return Err(ApiError::InvalidPayload(
            "upload response was not a JSON object".to_string(),
        ));
    };

    find(fields)
        .or_else(|| match fields.get("data") {
            Some(Value::Object(inner)) => find(inner),
            _ => None,
        })
        .ok_or_else(|| {
            ApiError::InvalidPayload("upload response did not include imageUrl or url".to_string())
        })
}

fn extract_pagination(fields: &Map<String, Value>) -> Result<Pagination, ApiError> {
    if let Some(value) = fields.get("pagination") {
        return decode(value.clone());
    }
    // Some endpoints flatten pagination next to the items.
    let flattened: Map<String, Value> = ["page", "limit", "total", "pages"]
        .iter()
        .filter_map(|key| fields.get(*key).map(|value| ((*key).to_string(), value.clone())))
        .collect();
    decode(Value::Object(flattened))
}

fn decode_items<R: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<R>, ApiError> {
    items.into_iter().map(decode).collect()
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|error| ApiError::InvalidPayload(error.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::{ItemId, News, Post};

    #[test]
    fn bare_array_gets_single_page_pagination() {
        let page: Page<Post> =
            normalize_list(json!([{"id": 1, "title": "a"}, {"id": 2, "title": "b"}])).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination, Pagination::single_page(2));
    }

    #[test]
    fn wrapped_items_keep_server_pagination() {
        let page: Page<News> = normalize_list(json!({
            "items": [{"id": 1, "title": "Conseil"}],
            "pagination": {"page": 2, "limit": 10, "total": 11, "pages": 2}
        }))
        .unwrap();
        assert_eq!(
            page.pagination,
            Pagination {
                page: 2,
                limit: 10,
                total: 11,
                pages: 2
            }
        );
    }

    #[test]
    fn resource_named_wrapper_is_accepted() {
        let page: Page<Post> = normalize_list(json!({"posts": [{"id": "p1", "title": "t"}]})).unwrap();
        assert_eq!(page.items[0].id, "p1".parse::<ItemId>().unwrap());
    }

    #[test]
    fn nested_data_object_is_unwrapped() {
        let page: Page<Post> = normalize_list(json!({
            "success": true,
            "data": {"items": [{"id": 3, "title": "t"}], "total": 30, "limit": 10}
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.total, 30);
        assert_eq!(page.pagination.pages, 3);
    }

    #[test]
    fn list_without_array_is_invalid() {
        assert!(normalize_list::<Post>(json!({"message": "ok"})).is_err());
    }

    #[test]
    fn single_item_wrappers_are_unwrapped() {
        let bare: Post = normalize_item(json!({"id": 1, "title": "t"})).unwrap();
        let data: Post = normalize_item(json!({"data": {"id": 1, "title": "t"}})).unwrap();
        let named: Post = normalize_item(json!({"post": {"id": 1, "title": "t"}})).unwrap();
        assert_eq!(bare, data);
        assert_eq!(bare, named);
    }

    #[test]
    fn upload_accepts_both_url_keys() {
        assert_eq!(
            normalize_upload_url(&json!({"imageUrl": "/u/x.jpg"})).unwrap(),
            "/u/x.jpg"
        );
        assert_eq!(
            normalize_upload_url(&json!({"url": "/u/y.pdf"})).unwrap(),
            "/u/y.pdf"
        );
        assert_eq!(
            normalize_upload_url(&json!({"data": {"url": "/u/z.png"}})).unwrap(),
            "/u/z.png"
        );
        assert!(normalize_upload_url(&json!({"path": "/u/x.jpg"})).is_err());
    }
}
