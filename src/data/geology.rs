//! Popups for features identified on the geology overlays
//!
//! An identify query returns the attribute maps of the features under the
//! cursor. Which labelled fields to show depends on the service the feature
//! came from; that is an explicit [`FeatureSchema`], taken from the overlay
//! configuration or a `schema` attribute, and otherwise inferred from the
//! first matching rule in [`SCHEMA_RULES`].

use crate::data::templates::feature_table_html;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSchema {
    /// Slovak Geofond register of mine works
    SlovakMineWork,
    /// Czech Geological Survey register of mine works
    CzechMineWork,
    Cave,
    UnderminedArea,
    DecorativeStone,
}

/// Key whose presence identifies the schema, checked in order
pub static SCHEMA_RULES: Lazy<Vec<(&'static str, FeatureSchema)>> = Lazy::new(|| {
    vec![
        ("NAZOV", FeatureSchema::SlovakMineWork),
        ("KLIC", FeatureSchema::CzechMineWork),
        ("CISLO_JESKYNE", FeatureSchema::Cave),
        ("POZUSTATEK", FeatureSchema::UnderminedArea),
        ("KAMEN", FeatureSchema::DecorativeStone),
    ]
});

impl FeatureSchema {
    pub fn title(&self) -> &'static str {
        match self {
            Self::SlovakMineWork => "Mine work (SK)",
            Self::CzechMineWork => "Mine work (CZ)",
            Self::Cave => "Cave",
            Self::UnderminedArea => "Undermined area",
            Self::DecorativeStone => "Decorative stone",
        }
    }

    /// Attribute keys and labels in display order
    pub fn fields(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::SlovakMineWork => &[
                ("NAZOV", "Name"),
                ("TYP", "Type"),
                ("SUROVINA", "Mineral"),
                ("OBDOBIE", "Period"),
                ("LOKALITA", "Locality"),
            ],
            Self::CzechMineWork => &[
                ("NAZEV", "Name"),
                ("DRUH_DILA", "Type"),
                ("SUROVINA", "Mineral"),
                ("OBDOBI", "Period"),
                ("STAV", "State"),
                ("KLIC", "Register number"),
            ],
            Self::Cave => &[
                ("NAZEV", "Name"),
                ("CISLO_JESKYNE", "Cave number"),
                ("DELKA", "Length"),
                ("HLOUBKA", "Depth"),
                ("PRISTUPNOST", "Accessibility"),
            ],
            Self::UnderminedArea => &[
                ("POZUSTATEK", "Remnant"),
                ("NAZEV", "Name"),
                ("SUROVINA", "Mineral"),
                ("OBDOBI", "Period"),
            ],
            Self::DecorativeStone => &[
                ("KAMEN", "Stone"),
                ("LOKALITA", "Locality"),
                ("VYUZITI", "Use"),
                ("STAV", "State"),
            ],
        }
    }

    /// First rule whose key is present in `attributes`
    pub fn infer(attributes: &Map<String, Value>) -> Option<Self> {
        SCHEMA_RULES
            .iter()
            .find(|(key, _)| attributes.contains_key(*key))
            .map(|(_, schema)| *schema)
    }

    /// Schema named by a `schema` attribute, if any
    fn declared(attributes: &Map<String, Value>) -> Option<Self> {
        let value = attributes.get("schema")?;
        match serde_json::from_value(value.clone()) {
            Ok(schema) => Some(schema),
            Err(_) => {
                log::warn!("ignoring unknown feature schema {}", value);
                None
            }
        }
    }
}

/// Attributes of one identified feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Result of an identify query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Set when the service reported a failure
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Map<String, Value>>) -> Self {
        Self {
            error: None,
            features: features
                .into_iter()
                .map(|attributes| Feature { attributes })
                .collect(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(Value::String(error.into())),
            features: Vec::new(),
        }
    }

    pub fn has_error(&self) -> bool {
        !matches!(self.error, None | Some(Value::Null) | Some(Value::Bool(false)))
    }
}

/// Content of a popup for an identified feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePopup {
    pub schema: FeatureSchema,
    pub html: String,
    /// Register id used to look up photos of a Czech mine work
    pub object_id: Option<u64>,
}

/// Display text of an attribute value
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn object_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Popup for the first feature of an identify result
///
/// `explicit` is the schema configured for the overlay the feature came from.
/// Returns `None` when nothing should be shown.
pub fn resolve_feature_popup(
    collection: &FeatureCollection,
    explicit: Option<FeatureSchema>,
) -> Option<FeaturePopup> {
    if collection.has_error() {
        log::debug!("identify failed: {:?}", collection.error);
        return None;
    }
    let attributes = &collection.features.first()?.attributes;
    if attributes.is_empty() {
        return None;
    }

    let schema = explicit
        .or_else(|| FeatureSchema::declared(attributes))
        .or_else(|| FeatureSchema::infer(attributes))?;

    let rows: Vec<(&str, String)> = schema
        .fields()
        .iter()
        .map(|(key, label)| (*label, attributes.get(*key).map(value_text).unwrap_or_default()))
        .collect();

    let object_id = match schema {
        FeatureSchema::CzechMineWork => attributes.get("KLIC").and_then(object_id),
        _ => None,
    };

    Some(FeaturePopup {
        schema,
        html: feature_table_html(schema.title(), &rows),
        object_id,
    })
}
