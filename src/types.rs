use crate::color::Color;
use crate::error::GeometryParseError;
use crate::wkt;
use geo::{MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One zone as validated at load time.
///
/// Numeric fields are `None` when the source had no usable value. They are
/// never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRecord {
    pub id: String,
    pub country: String,
    pub population: Option<f64>,
    /// km²
    pub area: Option<f64>,
    /// km
    pub road_length: Option<f64>,
    pub region: Option<String>,
    /// Boundary as well-known text, longitude/latitude order.
    pub geometry: Option<String>,
}

impl ZoneRecord {
    pub fn value(&self, attribute: Attribute) -> Option<f64> {
        match attribute {
            Attribute::Population => self.population,
            Attribute::Area => self.area,
        }
    }

    /// Decodes the boundary text. A record without geometry reports `Empty`.
    pub fn parse_geometry(&self) -> Result<ParsedGeometry, GeometryParseError> {
        match &self.geometry {
            Some(text) => wkt::decode(text),
            None => Err(GeometryParseError::Empty),
        }
    }
}

/// The numeric attribute driving the fill color of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Population,
    Area,
}

impl Attribute {
    pub const ALL: [Attribute; 2] = [Attribute::Population, Attribute::Area];

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Population => "population",
            Attribute::Area => "area",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Attribute::Population => "Population",
            Attribute::Area => "Area",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            Attribute::Population => None,
            Attribute::Area => Some("km²"),
        }
    }

    /// Legend caption, e.g. `Area (km²)`.
    pub fn caption(self) -> String {
        match self.unit() {
            Some(unit) => format!("{} ({})", self.display_name(), unit),
            None => self.display_name().to_string(),
        }
    }

    /// Decimal places used when printing values of this attribute.
    pub fn decimals(self) -> usize {
        match self {
            Attribute::Population => 0,
            Attribute::Area => 1,
        }
    }

    /// Gradient anchors used when a request does not override them.
    pub fn default_colors(self) -> (Color, Color) {
        match self {
            Attribute::Population => (Color::LIGHT_BLUE, Color::DARK_BLUE),
            Attribute::Area => (Color::LIGHT_GREEN, Color::DARK_GREEN),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded zone boundary. Outer rings are always closed.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl ParsedGeometry {
    pub fn polygons(&self) -> &[Polygon<f64>] {
        match self {
            ParsedGeometry::Polygon(polygon) => std::slice::from_ref(polygon),
            ParsedGeometry::MultiPolygon(multi) => &multi.0,
        }
    }

    pub fn ring_count(&self) -> usize {
        self.polygons()
            .iter()
            .map(|polygon| 1 + polygon.interiors().len())
            .sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons()
            .iter()
            .map(|polygon| {
                polygon.exterior().0.len()
                    + polygon.interiors().iter().map(|ring| ring.0.len()).sum::<usize>()
            })
            .sum()
    }
}

impl From<&ParsedGeometry> for geojson::Geometry {
    fn from(geometry: &ParsedGeometry) -> Self {
        match geometry {
            ParsedGeometry::Polygon(polygon) => geojson::Geometry::new(geojson::Value::from(polygon)),
            ParsedGeometry::MultiPolygon(multi) => geojson::Geometry::new(geojson::Value::from(multi)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(geometry: Option<&str>) -> ZoneRecord {
        ZoneRecord {
            id: "UK-1".to_string(),
            country: "United Kingdom".to_string(),
            population: Some(1200.0),
            area: None,
            road_length: None,
            region: None,
            geometry: geometry.map(str::to_string),
        }
    }

    #[test]
    fn test_value_by_attribute() {
        let zone = record(None);
        assert_eq!(zone.value(Attribute::Population), Some(1200.0));
        assert_eq!(zone.value(Attribute::Area), None);
    }

    #[test]
    fn test_missing_geometry_is_empty_error() {
        assert_eq!(record(None).parse_geometry(), Err(GeometryParseError::Empty));
    }

    #[test]
    fn test_counts_include_holes() {
        let zone = record(Some(
            "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))",
        ));
        let geometry = zone.parse_geometry().unwrap();
        assert_eq!(geometry.ring_count(), 2);
        assert_eq!(geometry.vertex_count(), 9);
        assert_eq!(geometry.polygons().len(), 1);
    }

    #[test]
    fn test_caption_has_unit() {
        assert_eq!(Attribute::Population.caption(), "Population");
        assert_eq!(Attribute::Area.caption(), "Area (km²)");
    }
}
