use color_eyre::Result;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    widgets::{Block, Borders, Paragraph},
};
use tracing::debug;

use super::{
    Component,
    map::{CanvasMap, MARKER_POPUP, MapOptions, MapWidget, Marker, TileLayer},
};
use crate::{
    config::MapConfig,
    location::LatLon,
    theme::{Theme, UiGroup},
};

pub const LOADING_MAP: &str = "Loading map...";

/// Map of the selected location with a single marker.
///
/// The first valid position mounts the map; later positions re-center the same
/// map instance at its current zoom. Input that does not parse keeps the last
/// position.
pub struct LocationPreview {
    config: MapConfig,
    theme: Theme,
    position: Option<LatLon>,
    map: Option<CanvasMap>,
    mounts: usize,
}

impl LocationPreview {
    pub fn new(config: MapConfig, theme: Theme) -> Self {
        Self {
            config,
            theme,
            position: None,
            map: None,
            mounts: 0,
        }
    }

    pub fn update_position(&mut self, lat: Option<&str>, lon: Option<&str>) {
        let (Some(lat), Some(lon)) = (lat, lon) else {
            return;
        };
        if lat.is_empty() || lon.is_empty() {
            return;
        }
        let Some(pos) = LatLon::parse(lat, lon) else {
            debug!(lat, lon, "ignoring malformed coordinates");
            return;
        };
        if self.position == Some(pos) {
            return;
        }
        self.position = Some(pos);

        match self.map.as_mut() {
            Some(map) => {
                let zoom = map.zoom();
                map.set_view(pos, zoom);
                map.set_marker_position(pos);
            }
            None => {
                let options = MapOptions {
                    center: pos,
                    zoom: self.config.zoom,
                    scroll_wheel_zoom: false,
                };
                let layer = TileLayer::new(&self.config.tile_url, &self.config.attribution);
                self.map = Some(CanvasMap::new(options, layer).with_marker(Marker {
                    position: pos,
                    popup: MARKER_POPUP.into(),
                }));
                self.mounts += 1;
            }
        }
    }

    pub fn position(&self) -> Option<LatLon> {
        self.position
    }

    pub fn map(&self) -> Option<&CanvasMap> {
        self.map.as_ref()
    }

    /// How many times a map instance was created.
    pub fn mount_count(&self) -> usize {
        self.mounts
    }
}

impl Component for LocationPreview {
    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        match &self.map {
            Some(map) => map.draw(f, area, &self.theme),
            None => {
                let placeholder = Paragraph::new(LOADING_MAP)
                    .alignment(Alignment::Center)
                    .style(self.theme.style(UiGroup::Dimmed))
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(self.theme.style(UiGroup::Border)),
                    );
                f.render_widget(placeholder, area);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ColorMode;
    use ratatui::{Terminal, backend::TestBackend};

    fn preview() -> LocationPreview {
        LocationPreview::new(MapConfig::default(), Theme::with_mode(ColorMode::Ansi16))
    }

    fn rendered_text(p: &mut LocationPreview) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                p.draw(f, area).unwrap();
            })
            .unwrap();
        let buf = terminal.backend().buffer();
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn absent_coordinates_show_placeholder() {
        let mut p = preview();
        p.update_position(None, Some("2.3522"));
        assert!(p.map().is_none());
        assert!(rendered_text(&mut p).contains(LOADING_MAP));
    }

    #[test]
    fn first_position_mounts_at_zoom_16() {
        let mut p = preview();
        p.update_position(Some("48.8566"), Some("2.3522"));

        let map = p.map().unwrap();
        assert_eq!(map.center(), LatLon::new(48.8566, 2.3522).unwrap());
        assert_eq!(map.zoom(), 16);
        assert!(!map.options().scroll_wheel_zoom);
        assert_eq!(map.marker().map(|m| m.popup.as_str()), Some(MARKER_POPUP));
        assert_eq!(p.mount_count(), 1);

        let text = rendered_text(&mut p);
        assert!(!text.contains(LOADING_MAP));
        assert!(text.contains("openstreetmap.org/16/33196/22546.png"));
    }

    #[test]
    fn new_position_recenters_without_remount() {
        let mut p = preview();
        p.update_position(Some("48.8566"), Some("2.3522"));
        p.update_position(Some("51.5"), Some("-0.12"));

        let london = LatLon::new(51.5, -0.12).unwrap();
        let map = p.map().unwrap();
        assert_eq!(map.center(), london);
        assert_eq!(map.zoom(), 16);
        assert_eq!(map.marker().map(|m| m.position), Some(london));
        assert_eq!(p.mount_count(), 1);
    }

    #[test]
    fn malformed_input_keeps_previous_position() {
        let mut p = preview();
        p.update_position(Some("48.8566"), Some("2.3522"));
        p.update_position(Some("north"), Some("2.0"));
        p.update_position(Some(""), Some(""));

        assert_eq!(p.position(), LatLon::new(48.8566, 2.3522));
        assert_eq!(p.mount_count(), 1);
    }
}
