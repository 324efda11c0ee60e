//! Location record normalization.
//!
//! Tree locations have been stored in several encodings over time:
//!
//! 1. `"<lat>,<lng>"`
//! 2. `["<lat>,<lng>", ...]`
//! 3. `[[lat, lng], ...]`
//! 4. `[{"coord": [lat, lng] | "<lat>,<lng>", "icon"?: .., "image"?: ..}, ...]`
//!
//! Shape 4 with list coords is canonical and is the only shape new writes use.
//! Everything here is total: bad input degrades to `None`/empty, never an error.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geo::Coordinate;

/// `<decimal>,<decimal>` anywhere in a string.
static DECIMAL_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+\.\d+)\s*,\s*(-?\d+\.\d+)").unwrap_or_else(|_| unreachable!())
});

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+\.\d+").unwrap_or_else(|_| unreachable!()));

/// One physical tree location with optional per-location overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    #[serde(rename = "coord")]
    pub coordinate: Coordinate,
    /// Marker image override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Photo of this particular location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Pin {
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            icon: None,
            image: None,
        }
    }
}

/// Structural classification of a stored `location` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationShape {
    /// Absent, null, blank, or an empty list.
    Empty,
    LegacyCsv,
    LegacyStringArray,
    PairArray,
    PinObjects,
    /// A lone `{coord}` or `{lat, lng}` object instead of a list.
    SingleObject,
    /// A list whose elements use more than one encoding.
    Mixed,
    Unrecognized,
}

impl LocationShape {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::LegacyCsv => "legacy-csv",
            Self::LegacyStringArray => "legacy-string-array",
            Self::PairArray => "pair-array",
            Self::PinObjects => "pin-objects",
            Self::SingleObject => "single-object",
            Self::Mixed => "mixed",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// A location value split into its raw text and, when it deserializes, its
/// JSON form.
struct Decoded<'a> {
    text: Cow<'a, str>,
    json: Option<Cow<'a, Value>>,
}

fn decode(location: &Value) -> Decoded<'_> {
    match location {
        Value::String(s) => decode_text(s),
        other => Decoded {
            text: Cow::Owned(other.to_string()),
            json: Some(Cow::Borrowed(other)),
        },
    }
}

fn decode_text(s: &str) -> Decoded<'_> {
    match serde_json::from_str::<Value>(s.trim()) {
        // Double-encoded rows: the JSON text is itself a quoted string.
        Ok(Value::String(inner)) => {
            let json = serde_json::from_str::<Value>(inner.trim())
                .ok()
                .map(Cow::Owned);
            Decoded {
                text: Cow::Owned(inner),
                json,
            }
        }
        Ok(v) => Decoded {
            text: Cow::Borrowed(s),
            json: Some(Cow::Owned(v)),
        },
        Err(e) => {
            log::debug!("location is not JSON ({e}), treating as plain text");
            Decoded {
                text: Cow::Borrowed(s),
                json: None,
            }
        }
    }
}

/// Reads a degree value from a JSON number or a numeric string.
pub(crate) fn degrees(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string field, or `None`.
pub(crate) fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// `"<lat>,<lng>"` with exactly two numeric tokens.
fn parse_csv_pair(s: &str) -> Option<Coordinate> {
    let mut parts = s.split(',');
    let lat = parts.next()?.trim().parse().ok()?;
    let lng = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    checked(lat, lng)
}

fn checked(lat: f64, lng: f64) -> Option<Coordinate> {
    let c = Coordinate::new(lat, lng);
    if c.is_none() {
        log::debug!("dropping out-of-range coordinate {lat},{lng}");
    }
    c
}

/// A `[lat, lng]` list or a `"<lat>,<lng>"` string.
fn coordinate_from_value(value: &Value) -> Option<Coordinate> {
    match value {
        Value::Array(items) if items.len() == 2 => checked(degrees(&items[0])?, degrees(&items[1])?),
        Value::String(s) => parse_csv_pair(s),
        _ => None,
    }
}

fn lat_lng_fields(map: &Map<String, Value>) -> Option<Coordinate> {
    checked(degrees(map.get("lat")?)?, degrees(map.get("lng")?)?)
}

fn coordinate_from_object(map: &Map<String, Value>) -> Option<Coordinate> {
    map.get("coord")
        .and_then(coordinate_from_value)
        .or_else(|| lat_lng_fields(map))
}

fn pin_from_object(map: &Map<String, Value>) -> Option<Pin> {
    coordinate_from_object(map).map(|coordinate| Pin {
        coordinate,
        icon: text_field(map, "icon"),
        image: text_field(map, "image"),
    })
}

fn pin_from_element(element: &Value) -> Option<Pin> {
    let pin = match element {
        Value::Object(map) => pin_from_object(map),
        Value::Array(_) | Value::String(_) => coordinate_from_value(element).map(Pin::new),
        _ => None,
    };
    if pin.is_none() {
        log::debug!("skipping location element {element}: not a coordinate");
    }
    pin
}

fn first_decimal_pair(text: &str) -> Option<Coordinate> {
    let caps = DECIMAL_PAIR.captures(text)?;
    checked(caps[1].parse().ok()?, caps[2].parse().ok()?)
}

/// The single representative location of a record, e.g. for centering a map.
///
/// Tried in order: the record's own `latitude`/`longitude` (`direct`), the
/// first element of a JSON list or a lone JSON object, a bare `"<lat>,<lng>"`
/// string, and finally the first comma-separated decimal pair found anywhere
/// in the raw text.
#[must_use]
pub fn parse_primary_coordinate(
    location: Option<&Value>,
    direct: Option<Coordinate>,
) -> Option<Coordinate> {
    if direct.is_some() {
        return direct;
    }
    let decoded = decode(location?);

    let from_json = decoded.json.as_deref().and_then(|json| match json {
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::Object(map) => coordinate_from_object(map),
            other => coordinate_from_value(other),
        }),
        Value::Object(map) => coordinate_from_object(map),
        _ => None,
    });

    from_json
        .or_else(|| parse_csv_pair(&decoded.text))
        .or_else(|| first_decimal_pair(&decoded.text))
}

/// Every pin of a record, in stored order.
///
/// Encodings are tried as a priority chain and the first one that claims the
/// record wins: a JSON list (elements that are not coordinates are skipped,
/// and an empty result is final), a lone JSON object, a `"<lat>,<lng>"`
/// string, the first two decimals anywhere in the text, and last the record's
/// own `latitude`/`longitude`. Text scans only run when the location is not a
/// JSON list or object, so a lone object without a coordinate leaves only the
/// direct fields.
#[must_use]
pub fn parse_all_coordinates(location: Option<&Value>, direct: Option<Coordinate>) -> Vec<Pin> {
    let claimed = location.and_then(|location| {
        let decoded = decode(location);
        match decoded.json.as_deref() {
            Some(Value::Array(items)) => Some(items.iter().filter_map(pin_from_element).collect()),
            Some(Value::Object(map)) => pin_from_object(map).map(|pin| vec![pin]),
            _ => parse_csv_pair(&decoded.text)
                .or_else(|| first_two_decimals(&decoded.text))
                .map(|c| vec![Pin::new(c)]),
        }
    });

    match claimed {
        Some(pins) => pins,
        None => {
            if location.is_some_and(|l| !is_blank(l)) && direct.is_none() {
                log::debug!("location matched no known encoding");
            }
            direct.map(Pin::new).into_iter().collect()
        }
    }
}

fn first_two_decimals(text: &str) -> Option<Coordinate> {
    let mut numbers = DECIMAL.find_iter(text).map(|m| m.as_str().parse::<f64>());
    let lat = numbers.next()?.ok()?;
    let lng = numbers.next()?.ok()?;
    checked(lat, lng)
}

fn is_blank(location: &Value) -> bool {
    match location {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Classifies a stored location by structure alone.
#[must_use]
pub fn detect_shape(location: Option<&Value>) -> LocationShape {
    let Some(location) = location.filter(|l| !is_blank(l)) else {
        return LocationShape::Empty;
    };
    let decoded = decode(location);

    match decoded.json.as_deref() {
        Some(Value::Array(items)) => {
            let mut shapes = items.iter().map(|item| match item {
                Value::String(_) => LocationShape::LegacyStringArray,
                Value::Array(_) => LocationShape::PairArray,
                Value::Object(_) => LocationShape::PinObjects,
                _ => LocationShape::Unrecognized,
            });
            let Some(first) = shapes.next() else {
                return LocationShape::Empty;
            };
            if shapes.all(|s| s == first) {
                first
            } else {
                LocationShape::Mixed
            }
        }
        Some(Value::Object(map)) if coordinate_from_object(map).is_some() => {
            LocationShape::SingleObject
        }
        Some(Value::Object(_)) => LocationShape::Unrecognized,
        _ if parse_csv_pair(&decoded.text).is_some() => LocationShape::LegacyCsv,
        _ => LocationShape::Unrecognized,
    }
}

/// Serializes pins in the canonical `[{"coord": [lat, lng], ..}]` shape.
#[must_use]
pub fn to_canonical_json(pins: &[Pin]) -> String {
    serde_json::to_string(pins).unwrap_or_else(|_| unreachable!())
}

/// Canonical re-encoding of a legacy location, or `None` when there is
/// nothing to rewrite.
///
/// Only lossless rewrites are produced: if any stored element fails to
/// normalize, the record is left as is.
#[must_use]
pub fn migrate_location(location: Option<&Value>) -> Option<String> {
    let shape = detect_shape(location);
    let location = location?;

    let expected = match shape {
        LocationShape::Empty | LocationShape::Mixed | LocationShape::Unrecognized => return None,
        LocationShape::PinObjects if is_canonical(location) => return None,
        LocationShape::LegacyCsv | LocationShape::SingleObject => 1,
        LocationShape::LegacyStringArray | LocationShape::PairArray | LocationShape::PinObjects => {
            match decode(location).json.as_deref() {
                Some(Value::Array(items)) => items.len(),
                _ => return None,
            }
        }
    };

    let pins = parse_all_coordinates(Some(location), None);
    if pins.len() == expected {
        Some(to_canonical_json(&pins))
    } else {
        log::debug!(
            "not migrating {} location: {} of {expected} elements normalize",
            shape.as_str(),
            pins.len(),
        );
        None
    }
}

/// Stored exactly as the editor writes it: a plain (not double-encoded) list
/// of pin objects whose `coord` is an in-range numeric pair.
fn is_canonical(location: &Value) -> bool {
    match location {
        Value::String(s) => serde_json::from_str::<Vec<Pin>>(s).is_ok(),
        other => Vec::<Pin>::deserialize(other).is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn all(s: &str) -> Vec<Pin> {
        parse_all_coordinates(Some(&text(s)), None)
    }

    fn primary(s: &str) -> Option<Coordinate> {
        parse_primary_coordinate(Some(&text(s)), None)
    }

    #[test]
    fn primary_returns_exact_csv_pair() {
        for (lat, lng) in [
            (16.5, 120.4),
            (-90.0, 180.0),
            (90.0, -180.0),
            (0.0, 0.0),
            (14.599_512, 120.984_222),
            (16.0, 120.0),
        ] {
            assert_eq!(primary(&format!("{lat},{lng}")), Some(coord(lat, lng)));
        }
    }

    #[test]
    fn out_of_range_is_never_returned() {
        for s in [
            "91.5,120.4",
            "16.5,181.5",
            "-90.5,0.5",
            "[[95.1,10.1]]",
            r#"[{"coord":[16.5,200.0]}]"#,
            r#"["100.1,10.1"]"#,
        ] {
            assert_eq!(primary(s), None, "{s}");
            assert!(all(s).is_empty(), "{s}");
        }
    }

    #[test]
    fn mixed_coord_encodings_keep_icon_and_order() {
        let pins = all(r#"[{"coord":[16.5,120.4],"icon":"a.png"},{"coord":"16.6,120.5"}]"#);
        assert_eq!(
            pins,
            vec![
                Pin {
                    coordinate: coord(16.5, 120.4),
                    icon: Some("a.png".to_string()),
                    image: None,
                },
                Pin::new(coord(16.6, 120.5)),
            ]
        );
    }

    #[test]
    fn place_name_in_list_yields_nothing() {
        assert!(all(r#"["Philippines"]"#).is_empty());
        assert!(all(r#"[{"coord":"Philippines"}]"#).is_empty());
    }

    #[test]
    fn place_name_does_not_fall_through_to_direct_fields() {
        let pins = parse_all_coordinates(Some(&text(r#"["Philippines"]"#)), Some(coord(1.5, 2.5)));
        assert!(pins.is_empty());
    }

    #[test]
    fn lone_object_without_coordinate_is_not_scanned() {
        let record = text(r#"{"coord":"Philippines","zoom":12.5,"radius":3.5}"#);
        assert!(parse_all_coordinates(Some(&record), None).is_empty());
        assert_eq!(
            parse_all_coordinates(Some(&record), Some(coord(16.5, 120.4))),
            vec![Pin::new(coord(16.5, 120.4))]
        );

        let structured = serde_json::json!({"address": "Lot 12.5, Block 3.25"});
        assert!(parse_all_coordinates(Some(&structured), None).is_empty());
    }

    #[test]
    fn lone_object_with_coordinate_keeps_overrides() {
        assert_eq!(
            all(r#"{"coord":[16.5,120.4],"icon":"a.png"}"#),
            vec![Pin {
                coordinate: coord(16.5, 120.4),
                icon: Some("a.png".to_string()),
                image: None,
            }]
        );
    }

    #[test]
    fn legacy_string_array_preserves_order() {
        assert_eq!(
            all(r#"["16.1,120.1","16.2,120.2"]"#),
            vec![Pin::new(coord(16.1, 120.1)), Pin::new(coord(16.2, 120.2))]
        );
    }

    #[test]
    fn pair_array() {
        assert_eq!(
            all("[[16.1,120.1],[16.2,120.2]]"),
            vec![Pin::new(coord(16.1, 120.1)), Pin::new(coord(16.2, 120.2))]
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let pins = all(r#"[{"coord":[16.1,120.1],"image":"a.jpg"},{"coord":[16.1,120.1],"image":"b.jpg"}]"#);
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[1].image.as_deref(), Some("b.jpg"));
    }

    #[test]
    fn garbage_yields_nothing() {
        assert_eq!(primary("not json at all"), None);
        assert!(all("not json at all").is_empty());
        assert!(all("").is_empty());
        assert!(all("{").is_empty());
        assert!(all("42").is_empty());
    }

    #[test]
    fn canonical_round_trip() {
        let pins = vec![
            Pin {
                coordinate: coord(16.5, 120.4),
                icon: Some("/icons/custom.png".to_string()),
                image: Some("/uploads/tree-1.jpg".to_string()),
            },
            Pin::new(coord(-12.25, 45.125)),
            Pin {
                coordinate: coord(16.5, 120.4),
                icon: None,
                image: Some("/uploads/tree-2.jpg".to_string()),
            },
        ];
        let json = to_canonical_json(&pins);
        assert_eq!(all(&json), pins);
    }

    #[test]
    fn canonical_json_omits_absent_fields() {
        let json = to_canonical_json(&[Pin::new(coord(16.5, 120.4))]);
        assert_eq!(json, r#"[{"coord":[16.5,120.4]}]"#);
    }

    #[test]
    fn empty_icon_counts_as_absent() {
        let pins = all(r#"[{"coord":[16.5,120.4],"icon":"","image":"  "}]"#);
        assert_eq!(pins, vec![Pin::new(coord(16.5, 120.4))]);
    }

    #[test]
    fn accepts_structured_values() {
        let value = serde_json::json!([{"coord": [16.5, 120.4], "icon": "a.png"}, [16.6, 120.5]]);
        let pins = parse_all_coordinates(Some(&value), None);
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].icon.as_deref(), Some("a.png"));
        assert_eq!(
            parse_primary_coordinate(Some(&value), None),
            Some(coord(16.5, 120.4))
        );
    }

    #[test]
    fn unwraps_double_encoded_text() {
        assert_eq!(all(r#""16.5,120.4""#), vec![Pin::new(coord(16.5, 120.4))]);
        assert_eq!(
            all(r#""[[16.5,120.4]]""#),
            vec![Pin::new(coord(16.5, 120.4))]
        );
    }

    #[test]
    fn numeric_strings_inside_pairs() {
        assert_eq!(
            all(r#"[{"coord":["16.5"," 120.4"]}]"#),
            vec![Pin::new(coord(16.5, 120.4))]
        );
    }

    #[test]
    fn primary_prefers_direct_fields() {
        let c = parse_primary_coordinate(Some(&text("[[1.5,2.5]]")), Some(coord(16.5, 120.4)));
        assert_eq!(c, Some(coord(16.5, 120.4)));
    }

    #[test]
    fn primary_reads_lat_lng_objects() {
        assert_eq!(primary(r#"{"lat":16.5,"lng":120.4}"#), Some(coord(16.5, 120.4)));
        assert_eq!(primary(r#"[{"lat":16.5,"lng":120.4}]"#), Some(coord(16.5, 120.4)));
    }

    #[test]
    fn primary_falls_back_to_regex_when_first_element_unusable() {
        assert_eq!(
            primary(r#"["Baguio City","16.41,120.59"]"#),
            Some(coord(16.41, 120.59))
        );
        assert_eq!(primary("Near the gate (16.41, 120.59)"), Some(coord(16.41, 120.59)));
    }

    #[test]
    fn all_falls_back_to_decimal_scan() {
        assert_eq!(
            all("Lat 16.41 Lng 120.59"),
            vec![Pin::new(coord(16.41, 120.59))]
        );
        assert!(all("Lat 16.41 only").is_empty());
    }

    #[test]
    fn direct_fields_are_last_resort() {
        let pins = parse_all_coordinates(None, Some(coord(16.5, 120.4)));
        assert_eq!(pins, vec![Pin::new(coord(16.5, 120.4))]);

        let pins = parse_all_coordinates(Some(&text("somewhere")), Some(coord(16.5, 120.4)));
        assert_eq!(pins, vec![Pin::new(coord(16.5, 120.4))]);

        let pins = parse_all_coordinates(Some(&text("16.1,120.1")), Some(coord(16.5, 120.4)));
        assert_eq!(pins, vec![Pin::new(coord(16.1, 120.1))]);
    }

    #[test]
    fn rejects_non_finite_tokens() {
        assert!(all("NaN,inf").is_empty());
        assert_eq!(primary("inf,1"), None);
    }

    #[test]
    fn detects_shapes() {
        let shape = |s: &str| detect_shape(Some(&text(s)));
        assert_eq!(detect_shape(None), LocationShape::Empty);
        assert_eq!(detect_shape(Some(&Value::Null)), LocationShape::Empty);
        assert_eq!(shape("  "), LocationShape::Empty);
        assert_eq!(shape("[]"), LocationShape::Empty);
        assert_eq!(shape("16.5,120.4"), LocationShape::LegacyCsv);
        assert_eq!(shape(r#"["16.5,120.4"]"#), LocationShape::LegacyStringArray);
        assert_eq!(shape("[[16.5,120.4]]"), LocationShape::PairArray);
        assert_eq!(shape(r#"[{"coord":[16.5,120.4]}]"#), LocationShape::PinObjects);
        assert_eq!(shape(r#"{"lat":16.5,"lng":120.4}"#), LocationShape::SingleObject);
        assert_eq!(shape(r#"{"zoom":12.5,"radius":3.5}"#), LocationShape::Unrecognized);
        assert_eq!(shape(r#"["16.5,120.4",[16.6,120.5]]"#), LocationShape::Mixed);
        assert_eq!(shape("Philippines"), LocationShape::Unrecognized);
    }

    #[test]
    fn migrates_legacy_shapes() {
        let migrate = |s: &str| migrate_location(Some(&text(s)));
        assert_eq!(
            migrate("16.5,120.4").as_deref(),
            Some(r#"[{"coord":[16.5,120.4]}]"#)
        );
        assert_eq!(
            migrate(r#"["16.1,120.1","16.2,120.2"]"#).as_deref(),
            Some(r#"[{"coord":[16.1,120.1]},{"coord":[16.2,120.2]}]"#)
        );
        assert_eq!(
            migrate("[[16.1,120.1]]").as_deref(),
            Some(r#"[{"coord":[16.1,120.1]}]"#)
        );
        assert_eq!(
            migrate(r#"[{"coord":"16.6,120.5","icon":"a.png"}]"#).as_deref(),
            Some(r#"[{"coord":[16.6,120.5],"icon":"a.png"}]"#)
        );
    }

    #[test]
    fn unwraps_double_encoded_canonical_records() {
        let inner = r#"[{"coord":[16.5,120.4],"icon":"a.png"}]"#;
        let stored = serde_json::to_string(inner).unwrap();
        assert_eq!(migrate_location(Some(&text(&stored))).as_deref(), Some(inner));
        assert_eq!(migrate_location(Some(&text(inner))), None);
    }

    #[test]
    fn structured_canonical_records_are_left_alone() {
        let value = serde_json::json!([{"coord": [16.5, 120.4]}, {"coord": [16.6, 120.5], "image": "b.jpg"}]);
        assert_eq!(migrate_location(Some(&value)), None);
    }

    #[test]
    fn leaves_canonical_and_lossy_records_alone() {
        let migrate = |s: &str| migrate_location(Some(&text(s)));
        assert_eq!(migrate(r#"[{"coord":[16.5,120.4],"icon":"a.png"}]"#), None);
        assert_eq!(migrate(r#"["Philippines","16.1,120.1"]"#), None);
        assert_eq!(migrate(r#"["16.1,120.1",[16.2,120.2]]"#), None);
        assert_eq!(migrate("not json at all"), None);
        assert_eq!(migrate(r#"{"coord":"Philippines","zoom":12.5,"radius":3.5}"#), None);
        assert_eq!(migrate_location(None), None);
    }
}
