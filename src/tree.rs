use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::geo::Coordinate;
use crate::icon::IconSet;
use crate::location::{self, LocationShape, Pin};

/// A tree as returned by `GET /api/trees`. Only the fields the map views need
/// are decoded; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    /// Raw stored location, either text or an already-parsed JSON value
    /// depending on how the database driver typed the column.
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default, deserialize_with = "lenient_degrees")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_degrees")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub pin_icon: Option<String>,
    #[serde(default)]
    pub tree_status: Option<String>,
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decimal columns frequently arrive as strings, and bad values must not
/// reject the whole record.
fn lenient_degrees<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(location::degrees))
}

impl TreeRecord {
    /// The record's own `latitude`/`longitude`, when both are present and in
    /// range.
    #[must_use]
    pub fn direct_coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude?, self.longitude?)
    }

    #[must_use]
    pub fn pins(&self) -> Vec<Pin> {
        location::parse_all_coordinates(self.location.as_ref(), self.direct_coordinate())
    }

    #[must_use]
    pub fn primary_coordinate(&self) -> Option<Coordinate> {
        location::parse_primary_coordinate(self.location.as_ref(), self.direct_coordinate())
    }

    #[must_use]
    pub fn shape(&self) -> LocationShape {
        location::detect_shape(self.location.as_ref())
    }

    /// Tree-level marker override, ignoring blank values.
    #[must_use]
    pub fn pin_icon(&self) -> Option<&str> {
        self.pin_icon.as_deref().filter(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.common_name.as_deref())
            .or(self.scientific_name.as_deref())
            .unwrap_or("(unnamed)")
    }

    #[must_use]
    pub fn summarize(&self, icons: &IconSet) -> TreeSummary {
        let pins = self.pins();
        let first = pins
            .first()
            .map(|p| p.coordinate)
            .or_else(|| self.primary_coordinate());
        TreeSummary {
            id: self.id.clone(),
            name: self.display_name().to_string(),
            shape: self.shape().as_str(),
            pin_count: pins.len(),
            first,
            icon: icons.select_pin_icon(self, pins.first()).to_string(),
        }
    }
}

/// What a list card shows for one tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeSummary {
    pub id: Option<String>,
    pub name: String,
    pub shape: &'static str,
    pub pin_count: usize,
    pub first: Option<Coordinate>,
    pub icon: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TreeListResponse {
    Bare(Vec<TreeRecord>),
    Trees { trees: Vec<TreeRecord> },
    Data { data: Vec<TreeRecord> },
}

/// Decodes a tree list, either a bare array or wrapped in `{"trees": [..]}`
/// or `{"data": [..]}`.
pub fn parse_tree_list(json: &str) -> Result<Vec<TreeRecord>, Error> {
    let response: TreeListResponse = serde_json::from_str(json)?;
    Ok(match response {
        TreeListResponse::Bare(trees)
        | TreeListResponse::Trees { trees }
        | TreeListResponse::Data { data: trees } => trees,
    })
}
