//! Map-rendering widget for the location preview.
//!
//! Slippy-map tile addressing follows the OpenStreetMap convention
//! (`z/x/y`, Web Mercator, `2^z` tiles per axis). The terminal rendering draws
//! the tile grid around the center, coastlines from the built-in world map and
//! the marker; the tile URL and attribution are shown below the canvas.

use std::f64::consts::PI;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    symbols,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph,
        canvas::{Canvas, Line as CanvasLine, Map as WorldMap, MapResolution},
    },
};

use crate::{
    location::LatLon,
    theme::{Theme, UiGroup},
};

pub const OSM_TILE_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";
pub const DEFAULT_ZOOM: u8 = 16;
pub const MAX_ZOOM: u8 = 19;
pub const MARKER_POPUP: &str = "A pretty CSS3 popup. Easily customizable.";

const SUBDOMAINS: [&str; 3] = ["a", "b", "c"];
/// Tiles shown per axis around the center tile.
const WINDOW_TILES: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn containing(pos: LatLon, zoom: u8) -> Self {
        let z = zoom.min(MAX_ZOOM);
        let n = f64::from(1u32 << z);
        let max = (1u32 << z) - 1;

        let x = ((pos.lon + 180.0) / 360.0 * n).floor();
        let lat = pos.lat.to_radians();
        let y = ((1.0 - lat.tan().asinh() / PI) / 2.0 * n).floor();

        Self {
            x: clamp_tile(x, max),
            y: clamp_tile(y, max),
            z,
        }
    }

    /// Longitude of the tile's west edge.
    pub fn west(&self) -> f64 {
        tile_lon(self.x, self.z)
    }

    /// Latitude of the tile's north edge.
    pub fn north(&self) -> f64 {
        tile_lat(self.y, self.z)
    }
}

fn clamp_tile(v: f64, max: u32) -> u32 {
    if v.is_nan() || v < 0.0 {
        0
    } else {
        (v as u32).min(max)
    }
}

fn tile_lon(x: u32, z: u8) -> f64 {
    f64::from(x) / f64::from(1u32 << z) * 360.0 - 180.0
}

fn tile_lat(y: u32, z: u8) -> f64 {
    let n = PI * (1.0 - 2.0 * f64::from(y) / f64::from(1u32 << z));
    n.sinh().atan().to_degrees()
}

/// Raster tile source.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub template: String,
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            template: OSM_TILE_TEMPLATE.into(),
            attribution: OSM_ATTRIBUTION.into(),
        }
    }
}

impl TileLayer {
    pub fn new(template: impl Into<String>, attribution: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            attribution: attribution.into(),
        }
    }

    /// Expand the template; `{s}` rotates over a/b/c by tile position.
    pub fn url(&self, tile: TileCoord) -> String {
        let s = SUBDOMAINS[((tile.x + tile.y) % SUBDOMAINS.len() as u32) as usize];
        self.template
            .replace("{s}", s)
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: LatLon,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LatLon,
    pub zoom: u8,
    pub scroll_wheel_zoom: bool,
}

/// Interactive map surface as seen by the preview.
pub trait MapWidget {
    fn center(&self) -> LatLon;
    fn zoom(&self) -> u8;
    /// Move the view in place; the widget is not recreated.
    fn set_view(&mut self, center: LatLon, zoom: u8);
    fn options(&self) -> &MapOptions;
    fn marker(&self) -> Option<&Marker>;
    fn draw(&self, f: &mut Frame<'_>, area: Rect, theme: &Theme);
}

/// Canvas based map for the terminal.
#[derive(Debug, Clone)]
pub struct CanvasMap {
    options: MapOptions,
    layer: TileLayer,
    marker: Option<Marker>,
}

impl CanvasMap {
    pub fn new(options: MapOptions, layer: TileLayer) -> Self {
        Self {
            options,
            layer,
            marker: None,
        }
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn set_marker_position(&mut self, position: LatLon) {
        if let Some(m) = self.marker.as_mut() {
            m.position = position;
        }
    }

    pub fn layer(&self) -> &TileLayer {
        &self.layer
    }

    pub fn center_tile(&self) -> TileCoord {
        TileCoord::containing(self.options.center, self.options.zoom)
    }

    pub fn center_tile_url(&self) -> String {
        self.layer.url(self.center_tile())
    }

    /// Lon/lat bounds of the rendered window.
    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let c = self.options.center;
        let tile_w = 360.0 / f64::from(1u32 << self.options.zoom.min(MAX_ZOOM));
        let half_w = tile_w * WINDOW_TILES / 2.0;
        let half_h = half_w * c.lat.to_radians().cos().max(0.01);
        (
            [c.lon - half_w, c.lon + half_w],
            [(c.lat - half_h).max(-90.0), (c.lat + half_h).min(90.0)],
        )
    }
}

impl MapWidget for CanvasMap {
    fn center(&self) -> LatLon {
        self.options.center
    }

    fn zoom(&self) -> u8 {
        self.options.zoom
    }

    fn set_view(&mut self, center: LatLon, zoom: u8) {
        self.options.center = center;
        self.options.zoom = zoom.min(MAX_ZOOM);
    }

    fn options(&self) -> &MapOptions {
        &self.options
    }

    fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    fn draw(&self, f: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let [map_area, info_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).areas(area);

        let (x_bounds, y_bounds) = self.bounds();
        let tile = self.center_tile();
        let grid_style = theme.style(UiGroup::Border);
        let grid_color = grid_style.fg.unwrap_or_default();
        let coast_color = theme.style(UiGroup::Dimmed).fg.unwrap_or_default();
        let marker_style = theme.style(UiGroup::Marker);

        let canvas = Canvas::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(grid_style)
                    .title(format!(
                        " {:.4}, {:.4} · z{} ",
                        self.options.center.lat, self.options.center.lon, self.options.zoom
                    )),
            )
            .marker(symbols::Marker::Braille)
            .x_bounds(x_bounds)
            .y_bounds(y_bounds)
            .paint(|ctx| {
                ctx.draw(&WorldMap {
                    color: coast_color,
                    resolution: MapResolution::High,
                });
                ctx.layer();
                for dx in 0..=3u32 {
                    let lon = tile_lon(tile.x.saturating_add(dx).saturating_sub(1), tile.z);
                    ctx.draw(&CanvasLine::new(lon, y_bounds[0], lon, y_bounds[1], grid_color));
                }
                for dy in 0..=3u32 {
                    let lat = tile_lat(tile.y.saturating_add(dy).saturating_sub(1), tile.z);
                    ctx.draw(&CanvasLine::new(x_bounds[0], lat, x_bounds[1], lat, grid_color));
                }
                if let Some(m) = &self.marker {
                    ctx.print(m.position.lon, m.position.lat, Span::styled("◉", marker_style));
                }
            });
        f.render_widget(canvas, map_area);

        let mut lines = Vec::new();
        if let Some(m) = &self.marker {
            lines.push(Line::from(Span::styled(m.popup.clone(), Style::default())));
        }
        lines.push(Line::from(Span::styled(
            self.center_tile_url(),
            theme.style(UiGroup::Dimmed),
        )));
        lines.push(Line::from(Span::styled(
            self.layer.attribution.clone(),
            theme.style(UiGroup::Dimmed),
        )));
        f.render_widget(Paragraph::new(lines), info_area);
    }
}
