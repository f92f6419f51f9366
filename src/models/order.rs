use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;

use super::{lenient_f64, lenient_id, lenient_seq};

/// Response body of `GET /api/orders/ml/public`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersEnvelope {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub orders: Vec<Order>,
}

/// An order as returned by the provider, with its store and line items populated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub store: Option<Reference>,
    /// Raw creation timestamp; parsed (or rejected) by the feature builder.
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn store_id(&self) -> Option<&str> {
        self.store.as_ref().and_then(|s| s.id.as_deref())
    }

    /// An order without a store reference never belongs to any store.
    pub fn belongs_to_store(&self, store_id: &str) -> bool {
        self.store_id() == Some(store_id)
    }

    /// Line items referencing `item_id`, in order.
    pub fn lines_for<'a>(&'a self, item_id: &'a str) -> impl Iterator<Item = &'a LineItem> + 'a {
        self.items
            .iter()
            .filter(move |line| line.item_id() == Some(item_id))
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.lines_for(item_id).next().is_some()
    }
}

/// One line of an order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub item: Option<Reference>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    /// Price recorded on the line itself.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
}

impl LineItem {
    pub fn item_id(&self) -> Option<&str> {
        self.item.as_ref().and_then(|i| i.id.as_deref())
    }

    /// Quantity sold, 0.0 when missing or non-numeric.
    pub fn quantity(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }

    /// Catalogue price of the referenced item, else the line price, else 0.0.
    pub fn unit_price(&self) -> f64 {
        self.item
            .as_ref()
            .and_then(|i| i.price)
            .or(self.price)
            .unwrap_or(0.0)
    }
}

/// Reference to another document: either populated or a bare id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "ReferenceRepr")]
pub struct Reference {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
}

impl Reference {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceRepr {
    Id(String),
    NumericId(serde_json::Number),
    Document {
        #[serde(rename = "_id", default, deserialize_with = "lenient_id")]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient_f64")]
        price: Option<f64>,
    },
    Unknown(IgnoredAny),
}

impl From<ReferenceRepr> for Reference {
    fn from(repr: ReferenceRepr) -> Self {
        match repr {
            ReferenceRepr::Id(id) => Reference::id(id),
            ReferenceRepr::NumericId(id) => Reference::id(id.to_string()),
            ReferenceRepr::Document { id, name, price } => Reference { id, name, price },
            ReferenceRepr::Unknown(_) => Reference::default(),
        }
    }
}
