//! Location records and photo lists as served by the site's JSON endpoints

use crate::{
    core::geo::LatLng,
    data::templates::location_popup_html,
    layers::marker::{Marker, MarkerTags, Tooltip},
    MapError, Result,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Treat `null` like a missing text field
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub accessibility: String,
}

impl LocationRecord {
    /// Position of the record; missing or out-of-range coordinates are a render error
    pub fn position(&self) -> Result<LatLng> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                let position = LatLng::new(lat, lng);
                if position.is_valid() {
                    Ok(position)
                } else {
                    Err(MapError::Render(format!(
                        "location {} has invalid coordinates {}",
                        self.id, position
                    )))
                }
            }
            _ => Err(MapError::Render(format!(
                "location {} has no coordinates",
                self.id
            ))),
        }
    }

    pub fn tags(&self) -> MarkerTags {
        MarkerTags::new(&self.kind, &self.state, &self.accessibility)
    }

    /// Marker with the location popup, a hover tooltip and filter tags
    pub fn to_marker(&self) -> Result<Marker> {
        let position = self.position()?;
        Ok(Marker::new(format!("location-{}", self.id), position, &self.name)
            .with_popup(location_popup_html(self))
            .with_tooltip(Tooltip::new(&self.name))
            .with_tags(self.tags()))
    }
}

#[derive(Deserialize)]
struct LocationsPayload {
    locations: Vec<serde_json::Value>,
}

/// Parsed `{ "locations": [...] }` body
#[derive(Debug, Default)]
pub struct LocationBatch {
    pub records: Vec<LocationRecord>,
    /// Entries that could not be read as a record
    pub errors: Vec<MapError>,
}

impl LocationBatch {
    /// Parse a response body
    ///
    /// A body without a `locations` array fails as a whole; a malformed entry
    /// only lands in `errors`.
    pub fn parse(body: &str) -> Result<Self> {
        let payload: LocationsPayload = serde_json::from_str(body)?;
        let mut batch = Self::default();
        for (index, value) in payload.locations.into_iter().enumerate() {
            match serde_json::from_value::<LocationRecord>(value) {
                Ok(record) => batch.records.push(record),
                Err(e) => batch
                    .errors
                    .push(MapError::Render(format!("location #{}: {}", index, e))),
            }
        }
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Photo of a mine work shown in a feature popup gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// Parsed `{ "photos": [...] }` body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoBatch {
    pub photos: Vec<Photo>,
}

impl PhotoBatch {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}
