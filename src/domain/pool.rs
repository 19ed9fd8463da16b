//! Pool Documents
//!
//! JSON:API-shaped pool response: a primary `data` resource with relationship
//! links to its pairs and tokens, and an `included` list of side resources.
//! Only the parts the enrichment needs are modelled; everything else stays
//! as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkList {
    #[serde(default)]
    pub data: Vec<ResourceLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolRelationships {
    #[serde(default)]
    pub pairs: Option<LinkList>,
    #[serde(default)]
    pub tokens: Option<LinkList>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolResource {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub relationships: Option<PoolRelationships>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludedResource {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: Value,
}

/// Top-level pool document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolDocument {
    #[serde(default)]
    pub data: Option<PoolResource>,
    #[serde(default)]
    pub included: Vec<IncludedResource>,
}

impl PoolDocument {
    /// Parse a document, treating a non-object `data` (e.g. `[]`) as absent
    pub fn from_value(mut value: Value) -> Result<Self, serde_json::Error> {
        if let Some(obj) = value.as_object_mut() {
            if obj.get("data").map_or(false, |d| !d.is_object()) {
                obj.remove("data");
            }
        }
        serde_json::from_value(value)
    }

    /// What is missing for the document to be usable, if anything
    pub fn missing_structure(&self) -> Option<&'static str> {
        let Some(data) = &self.data else {
            return Some("data");
        };
        let has_pairs = data
            .relationships
            .as_ref()
            .and_then(|r| r.pairs.as_ref())
            .map_or(false, |p| !p.data.is_empty());
        if !has_pairs {
            return Some("relationships");
        }
        if self.included.is_empty() {
            return Some("included");
        }
        None
    }

    pub fn is_complete(&self) -> bool {
        self.missing_structure().is_none()
    }

    /// Pool id used by the candlestick endpoint
    pub fn pool_id(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.id.as_str()).filter(|s| !s.is_empty())
    }

    /// First pair linked from the pool
    pub fn pair_id(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .relationships
            .as_ref()?
            .pairs
            .as_ref()?
            .data
            .first()
            .map(|l| l.id.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Circulating supply reported by the included token resource of `mint`
    pub fn circulating_supply(&self, mint: &str) -> Option<f64> {
        self.included
            .iter()
            .filter(|r| r.kind == "token")
            .find(|r| r.attributes.get("address").and_then(Value::as_str) == Some(mint))
            .and_then(|r| read_supply(&r.attributes))
    }
}

fn read_supply(attributes: &Value) -> Option<f64> {
    let raw = attributes.get("circulating_supply")?;
    let supply = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (supply.is_finite() && supply > 0.0).then_some(supply)
}
