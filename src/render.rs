use crate::color::{Color, ColorScale};
use crate::config::{AppConfig, RenderConfig};
use crate::error::{EmptyDomainError, EmptyInputError, EmptySelectionError};
use crate::map::{DecodedZone, MapComposer, MapDocument};
use crate::types::Attribute;
use crate::viewport::{self, Viewport};
use crate::zones::ZoneTable;
use anyhow::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One map to draw: a group, the attribute to color by, and optional
/// gradient anchors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderRequest {
    pub group: String,
    pub attribute: Attribute,
    pub low: Option<Color>,
    pub high: Option<Color>,
}

impl RenderRequest {
    pub fn new(group: impl Into<String>, attribute: Attribute) -> Self {
        RenderRequest {
            group: group.into(),
            attribute,
            low: None,
            high: None,
        }
    }

    pub fn with_colors(mut self, low: Option<Color>, high: Option<Color>) -> Self {
        self.low = low;
        self.high = high;
        self
    }

    pub fn colors(&self) -> (Color, Color) {
        let (low, high) = self.attribute.default_colors();
        (self.low.unwrap_or(low), self.high.unwrap_or(high))
    }
}

/// Runs the whole pipeline for one request. Zones with bad geometry, an
/// attribute without values and a selection without centroids all degrade
/// the map with a notice; only a selection with nothing drawable fails.
pub fn render_map(
    table: &ZoneTable,
    request: &RenderRequest,
    settings: &RenderConfig,
) -> Result<MapDocument, EmptySelectionError> {
    let selection = table.filter_by_group(&request.group);
    debug!(group = %request.group, zones = selection.len(), "rendering selection");

    let mut composer = MapComposer::new(settings);
    let mut zones = Vec::with_capacity(selection.len());
    let mut skipped = 0;
    for record in selection {
        match record.parse_geometry() {
            Ok(geometry) => {
                debug!(
                    zone = %record.id,
                    rings = geometry.ring_count(),
                    vertices = geometry.vertex_count(),
                    "decoded boundary"
                );
                zones.push(DecodedZone { record, geometry });
            }
            Err(err) => {
                warn!(zone = %record.id, error = %err, "zone left off the map");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        composer.notice(format!(
            "{skipped} zone(s) without valid boundary geometry are not shown on the map."
        ));
    }

    let viewport = viewport_for(&request.group, &zones, settings);

    let (low, high) = request.colors();
    let values = zones.iter().map(|z| z.record.value(request.attribute));
    let scale = match ColorScale::build(values, low, high) {
        Ok(scale) => Some(scale.with_neutral(settings.neutral_color)),
        Err(EmptyDomainError) => {
            if !zones.is_empty() {
                warn!(group = %request.group, attribute = %request.attribute, "no values to color by");
                composer.notice(format!(
                    "No {} data for {}; zones are shown without color coding.",
                    request.attribute.display_name().to_lowercase(),
                    request.group
                ));
            }
            None
        }
    };

    composer.compose(&request.group, &zones, scale.as_ref(), request.attribute, viewport)
}

/// Centers on the zones, or uses the configured default view when none of
/// them yields a centroid. With an empty zone list the caller reports an
/// empty selection, so here the fallback only matters to callers composing
/// their own zone lists.
pub fn viewport_for(group: &str, zones: &[DecodedZone<'_>], settings: &RenderConfig) -> Viewport {
    match viewport::center(zones.iter().map(|z| &z.geometry)) {
        Ok(center) => Viewport {
            center,
            zoom: settings.zoom,
        },
        Err(EmptyInputError) => {
            warn!(group, "nothing to center on, using default view");
            settings.fallback_viewport()
        }
    }
}

/// File name for a rendered map, e.g. `united_kingdom_population.html`.
pub fn artifact_name(group: &str, attribute: Attribute) -> String {
    let mut slug = String::with_capacity(group.len());
    for c in group.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    format!("{}_{}.html", if slug.is_empty() { "zones" } else { slug }, attribute)
}

/// Renders one request to `output`, or to the configured output directory.
/// Returns `None` when the selection had nothing to draw.
pub fn render_to_file(
    config: &AppConfig,
    table: &ZoneTable,
    request: &RenderRequest,
    output: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let doc = match render_map(table, request, &config.render) {
        Ok(doc) => doc,
        Err(err) => {
            info!("{}", err);
            return Ok(None);
        }
    };
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output.dir.join(artifact_name(&request.group, request.attribute)));
    doc.write_html(&path)?;
    info!(path = ?path, features = doc.features.len(), "map written");
    Ok(Some(path))
}

/// Renders every group for every attribute. Requests are independent and
/// run in parallel.
pub fn render_all(config: &AppConfig, table: &ZoneTable) -> Result<Vec<PathBuf>> {
    let requests: Vec<RenderRequest> = table
        .available_groups()
        .into_iter()
        .flat_map(|group| Attribute::ALL.map(|attribute| RenderRequest::new(group, attribute)))
        .collect();
    info!(maps = requests.len(), "rendering all selections");

    let written = requests
        .par_iter()
        .map(|request| render_to_file(config, table, request, None))
        .collect::<Result<Vec<_>>>()?;
    Ok(written.into_iter().flatten().collect())
}
