//! Assembling a choropleth map document from decoded zones.

use crate::color::{Color, ColorScale};
use crate::config::RenderConfig;
use crate::error::EmptySelectionError;
use crate::html::escape;
use crate::types::{Attribute, ParsedGeometry, ZoneRecord};
use crate::viewport::Viewport;
use serde::Serialize;

/// Shown in popups in place of a missing number.
pub const NOT_AVAILABLE: &str = "N/A";

/// A zone whose boundary decoded successfully.
#[derive(Debug, Clone)]
pub struct DecodedZone<'a> {
    pub record: &'a ZoneRecord,
    pub geometry: ParsedGeometry,
}

/// Leaflet path options for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub fill_color: Color,
    pub color: Color,
    pub weight: f64,
    pub fill_opacity: f64,
}

/// A zone paired with its precomputed style.
#[derive(Debug, Clone)]
pub struct StyledZone<'a> {
    pub zone: &'a DecodedZone<'a>,
    pub style: FeatureStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapFeature {
    pub id: String,
    pub geometry: geojson::Geometry,
    pub style: FeatureStyle,
    pub popup: String,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub caption: String,
    pub min: f64,
    pub max: f64,
    pub low: Color,
    pub high: Color,
    pub decimals: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseLayer {
    pub url: String,
    pub attribution: String,
}

/// A composed map, ready for a presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct MapDocument {
    pub title: String,
    pub base_layer: BaseLayer,
    pub viewport: Viewport,
    pub features: Vec<MapFeature>,
    /// Absent when the selection had no values to color by.
    pub legend: Option<Legend>,
    pub notices: Vec<String>,
    pub popup_max_width: u32,
}

pub struct MapComposer<'a> {
    settings: &'a RenderConfig,
    notices: Vec<String>,
}

impl<'a> MapComposer<'a> {
    pub fn new(settings: &'a RenderConfig) -> Self {
        MapComposer {
            settings,
            notices: Vec::new(),
        }
    }

    /// Records a degradation message shown alongside the map.
    pub fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    /// Pairs every zone with its style. Without a scale every zone gets the
    /// neutral fill.
    pub fn style_zones<'z>(
        &self,
        zones: &'z [DecodedZone<'z>],
        scale: Option<&ColorScale>,
        attribute: Attribute,
    ) -> Vec<StyledZone<'z>> {
        zones
            .iter()
            .map(|zone| {
                let fill_color = match scale {
                    Some(scale) => scale.map(zone.record.value(attribute)),
                    None => self.settings.neutral_color,
                };
                StyledZone {
                    zone,
                    style: FeatureStyle {
                        fill_color,
                        color: self.settings.border_color,
                        weight: self.settings.border_weight,
                        fill_opacity: self.settings.fill_opacity,
                    },
                }
            })
            .collect()
    }

    /// Builds the document. An empty zone list is reported as
    /// `EmptySelectionError` instead of a featureless map.
    pub fn compose(
        self,
        selection: &str,
        zones: &[DecodedZone<'_>],
        scale: Option<&ColorScale>,
        attribute: Attribute,
        viewport: Viewport,
    ) -> Result<MapDocument, EmptySelectionError> {
        if zones.is_empty() {
            return Err(EmptySelectionError {
                group: selection.to_string(),
            });
        }

        let features = self
            .style_zones(zones, scale, attribute)
            .into_iter()
            .map(|styled| MapFeature {
                id: styled.zone.record.id.clone(),
                geometry: geojson::Geometry::from(&styled.zone.geometry),
                style: styled.style,
                popup: popup_text(styled.zone.record),
                tooltip: tooltip_text(styled.zone.record),
            })
            .collect();

        let legend = scale.map(|scale| Legend {
            caption: attribute.caption(),
            min: scale.min(),
            max: scale.max(),
            low: scale.low(),
            high: scale.high(),
            decimals: attribute.decimals(),
        });

        Ok(MapDocument {
            title: format!("{} - {}", selection, attribute.display_name()),
            base_layer: BaseLayer {
                url: self.settings.tile_url.clone(),
                attribution: self.settings.attribution.clone(),
            },
            viewport,
            features,
            legend,
            notices: self.notices,
            popup_max_width: self.settings.popup_max_width,
        })
    }
}

pub fn popup_text(record: &ZoneRecord) -> String {
    let mut popup = format!(
        "<b>Zone: {}</b><br>Population: {}<br>Area: {}<br>Roads: {}",
        escape(&record.id),
        quantity(record.population, 0, None),
        quantity(record.area, 1, Some("km²")),
        quantity(record.road_length, 1, Some("km")),
    );
    if let Some(region) = &record.region {
        popup.push_str("<br>Region: ");
        popup.push_str(&escape(region));
    }
    popup
}

pub fn tooltip_text(record: &ZoneRecord) -> String {
    format!("Zone: {}", escape(&record.id))
}

fn quantity(value: Option<f64>, decimals: usize, unit: Option<&str>) -> String {
    match (value, unit) {
        (Some(v), Some(unit)) => format!("{} {}", format_number(v, decimals), unit),
        (Some(v), None) => format_number(v, decimals),
        (None, _) => NOT_AVAILABLE.to_string(),
    }
}

/// Fixed decimals with comma thousands separators, e.g. `1,234,567.9`.
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value.is_sign_negative() && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}
