//! Standalone Leaflet pages for composed maps.

use crate::map::{format_number, Legend, MapDocument};
use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

const PAGE_STYLE: &str = r#"
      html, body { height: 100%; margin: 0; padding: 0; font-family: sans-serif; }
      #map { height: 100%; width: 100%; }
      .notices {
        position: absolute; top: 10px; left: 50px; right: 50px; z-index: 1000;
        background: #fff3cd; border: 1px solid #e0c060; border-radius: 4px;
        padding: 6px 10px;
      }
      .legend {
        background: white; padding: 6px 10px; border-radius: 4px;
        box-shadow: 0 1px 4px rgba(0,0,0,0.3); min-width: 200px;
      }
      .legend .bar { height: 12px; margin: 4px 0; }
      .legend .labels { display: flex; justify-content: space-between; font-size: 11px; }
"#;

/// Minimal HTML escaping for text placed in markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that is safe to inline in a `<script>` element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

impl MapDocument {
    /// The zones as a GeoJSON feature collection carrying style, popup and
    /// tooltip in their properties.
    pub fn feature_collection(&self) -> serde_json::Value {
        let features: Vec<_> = self
            .features
            .iter()
            .map(|feature| {
                json!({
                    "type": "Feature",
                    "geometry": feature.geometry,
                    "properties": {
                        "id": feature.id,
                        "style": feature.style,
                        "popup": feature.popup,
                        "tooltip": feature.tooltip,
                    },
                })
            })
            .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }

    pub fn to_html(&self) -> String {
        let view = self.viewport;
        let options = json!({
            "center": [view.center.lat, view.center.lng],
            "zoom": view.zoom,
            "tiles": self.base_layer.url,
            "attribution": self.base_layer.attribution,
            "popupMaxWidth": self.popup_max_width,
        });

        let notices = if self.notices.is_empty() {
            String::new()
        } else {
            let items: String = self
                .notices
                .iter()
                .map(|n| format!("<div>{}</div>", escape(n)))
                .collect();
            format!(r#"<div class="notices">{items}</div>"#)
        };

        let legend = self
            .legend
            .as_ref()
            .map(legend_html)
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
    <title>{title}</title>
    <link rel="stylesheet" href="{css}" />
    <style>{style}</style>
  </head>
  <body>
    {notices}
    <div id="map"></div>
    <script src="{js}"></script>
    <script>
      const options = {options};
      const zones = {zones};
      const map = L.map('map').setView(options.center, options.zoom);
      L.tileLayer(options.tiles, {{ attribution: options.attribution, maxZoom: 19 }}).addTo(map);
      L.geoJSON(zones, {{
        style: (feature) => feature.properties.style,
        onEachFeature: (feature, layer) => {{
          layer.bindPopup(feature.properties.popup, {{ maxWidth: options.popupMaxWidth }});
          layer.bindTooltip(feature.properties.tooltip);
        }},
      }}).addTo(map);
      const legendHtml = {legend};
      if (legendHtml) {{
        const legend = L.control({{ position: 'topright' }});
        legend.onAdd = () => {{
          const div = L.DomUtil.create('div', 'legend');
          div.innerHTML = legendHtml;
          return div;
        }};
        legend.addTo(map);
      }}
    </script>
  </body>
</html>
"#,
            title = escape(&self.title),
            css = LEAFLET_CSS,
            js = LEAFLET_JS,
            style = PAGE_STYLE,
            notices = notices,
            options = script_json(&options),
            zones = script_json(&self.feature_collection()),
            legend = script_json(&json!(legend)),
        )
    }

    /// Writes the page to `path`, creating parent directories.
    pub fn write_html(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
        fs::write(path, self.to_html())
            .with_context(|| format!("Failed to write map: {:?}", path))
    }
}

fn legend_html(legend: &Legend) -> String {
    format!(
        r#"<div>{caption}</div><div class="bar" style="background: linear-gradient(to right, {low}, {high});"></div><div class="labels"><span>{min}</span><span>{max}</span></div>"#,
        caption = escape(&legend.caption),
        low = legend.low,
        high = legend.high,
        min = format_number(legend.min, legend.decimals),
        max = format_number(legend.max, legend.decimals),
    )
}

/// Page shown instead of a map when a selection has nothing to draw.
pub fn empty_page(group: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head><meta charset="UTF-8" /><title>No data</title></head>
  <body>
    <p>No data for this selection: {}</p>
    <p><a href="/">Back</a></p>
  </body>
</html>
"#,
        escape(group)
    )
}

/// Selection form for the HTTP front end.
pub fn index_page(groups: &[&str], default_group: &str) -> String {
    let options: String = groups
        .iter()
        .map(|group| {
            let selected = if *group == default_group { " selected" } else { "" };
            format!(
                r#"<option value="{0}"{1}>{0}</option>"#,
                escape(group),
                selected
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head><meta charset="UTF-8" /><title>Zone maps</title></head>
  <body>
    <h1>Zone maps</h1>
    <form action="/map" method="get">
      <label for="country">Country: </label>
      <select id="country" name="country">{options}</select>
      <label><input type="radio" name="attribute" value="population" checked /> Population</label>
      <label><input type="radio" name="attribute" value="area" /> Area</label>
      <button type="submit">Show map</button>
    </form>
  </body>
</html>
"#
    )
}
