use serde::Deserialize;

use super::{lenient_i64, lenient_id, lenient_seq};

/// Response body of `GET /api/items/store/{storeId}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemsEnvelope {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub items: Vec<Item>,
}

/// A stocked item of a store. Read-only here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id", default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Units currently on hand.
    #[serde(rename = "quantity", default, deserialize_with = "lenient_i64")]
    pub current_qty: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub reorder_threshold: Option<i64>,
}
