//! The address form: composition root of search field, form-state manager and
//! location preview.

use std::sync::Arc;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use geocoding::Geocoder;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};
use tui_input::{Input, backend::crossterm::EventHandler};

use super::{
    Component,
    preview::LocationPreview,
    search_field::{AddressSearchField, SearchSettings},
};
use crate::{
    action::Action,
    config::Config,
    form::{FieldKind, FormField, FormManager},
    location::SelectedLocation,
    theme::{Theme, UiGroup},
    tui::EventResponse,
};

pub const ADDRESS: &str = "address";
pub const NAME: &str = "name";
pub const EMAIL: &str = "email";
pub const INTERNET: &str = "internet";
pub const KITCHEN: &str = "kitchen";
pub const COFFEE: &str = "coffee";
pub const NUM_ROOM: &str = "num_room";
pub const DISTANCE: &str = "distance";

/// Validated values handed out on submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormValues {
    pub address: String,
    pub name: String,
    pub email: String,
    pub internet: bool,
    pub kitchen: bool,
    pub coffee: bool,
    pub num_room: Option<f64>,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub values: FormValues,
    pub location: SelectedLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Address,
    Field(&'static str),
    Submit,
}

const FOCUS_ORDER: [Focus; 9] = [
    Focus::Address,
    Focus::Field(NAME),
    Focus::Field(EMAIL),
    Focus::Field(INTERNET),
    Focus::Field(KITCHEN),
    Focus::Field(COFFEE),
    Focus::Field(NUM_ROOM),
    Focus::Field(DISTANCE),
    Focus::Submit,
];

pub struct AddressForm {
    form: FormManager,
    search: AddressSearchField,
    preview: LocationPreview,
    selected: SelectedLocation,
    config: Config,
    theme: Theme,
    focus: usize,
    editor: Input,
    last_submission: Option<Submission>,
}

impl AddressForm {
    pub fn new(geocoder: Arc<dyn Geocoder>, config: Config, theme: Theme) -> Self {
        let mut form = FormManager::new("Address Form");
        form.register(FormField::new(ADDRESS, "Address", FieldKind::Text).required("Address is required"));
        form.register(FormField::new(NAME, "Name", FieldKind::Text).required("Name is required"));
        form.register(FormField::new(EMAIL, "Email", FieldKind::Email).required("Email is required"));
        form.register(FormField::new(INTERNET, "Internet", FieldKind::Bool));
        form.register(FormField::new(KITCHEN, "Kitchen", FieldKind::Bool));
        form.register(FormField::new(COFFEE, "Coffee Machine", FieldKind::Bool));
        form.register(FormField::new(NUM_ROOM, "Number of Rooms", FieldKind::Number));
        form.register(
            FormField::new(DISTANCE, "Distance", FieldKind::Number).required("Distance is required"),
        );

        let search = AddressSearchField::new(
            geocoder,
            SearchSettings::from(&config.geocoding),
            theme.clone(),
        );
        let preview = LocationPreview::new(config.map.clone(), theme.clone());

        Self {
            form,
            search,
            preview,
            selected: SelectedLocation::default(),
            config,
            theme,
            focus: 0,
            editor: Input::default(),
            last_submission: None,
        }
    }

    pub fn form(&self) -> &FormManager {
        &self.form
    }

    pub fn search(&self) -> &AddressSearchField {
        &self.search
    }

    pub fn selected_location(&self) -> &SelectedLocation {
        &self.selected
    }

    pub fn last_submission(&self) -> Option<&Submission> {
        self.last_submission.as_ref()
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.form.is_valid()
    }

    /// The preview, present only while a real location is selected.
    pub fn preview(&self) -> Option<&LocationPreview> {
        self.selected.is_selected().then_some(&self.preview)
    }

    /// Set a plain field as if the user had typed it.
    pub fn set_field(&mut self, key: &str, value: &str) {
        self.form.set_value(key, value);
        self.form.touch(key);
        if self.focused_key() == Some(key) {
            self.editor = Input::default().with_value(value.to_string());
        }
    }

    pub fn toggle(&mut self, key: &str) {
        self.form.toggle(key);
    }

    fn apply_location(&mut self, location: SelectedLocation) {
        let address = location.display_name.clone();
        self.form.set_value(ADDRESS, address);
        self.form.touch(ADDRESS);

        match location.preview_coords() {
            Some((lat, lon)) => self.preview.update_position(Some(lat), Some(lon)),
            None => self.preview = LocationPreview::new(self.config.map.clone(), self.theme.clone()),
        }
        debug!(?location, "selected location changed");
        self.selected = location;
    }

    /// Validate, record and reset. Does nothing while the form is invalid.
    pub fn submit(&mut self) -> Result<Option<Submission>> {
        if !self.is_submit_enabled() {
            return Ok(None);
        }
        let Some(values) = self.form.handle_submit() else {
            return Ok(None);
        };
        let values: FormValues = serde_json::from_value(serde_json::Value::Object(values))?;
        let submission = Submission {
            values,
            location: self.selected.clone(),
        };
        info!(
            submission = %serde_json::to_string(&submission)?,
            "Form submitted successfully"
        );

        self.search.clear();
        self.apply_location(SelectedLocation::default());
        self.form.reset();
        self.editor = Input::default();
        self.focus = 0;
        self.last_submission = Some(submission.clone());
        Ok(Some(submission))
    }

    fn focused(&self) -> Focus {
        FOCUS_ORDER[self.focus]
    }

    fn focused_key(&self) -> Option<&'static str> {
        match self.focused() {
            Focus::Field(key) => Some(key),
            Focus::Address => Some(ADDRESS),
            Focus::Submit => None,
        }
    }

    fn move_focus(&mut self, forward: bool) {
        if let Some(key) = self.focused_key() {
            self.form.touch(key);
        }
        let len = FOCUS_ORDER.len();
        self.focus = if forward {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
        if let Focus::Field(key) = self.focused() {
            self.editor = Input::default().with_value(self.form.value(key).to_string());
        }
    }

    fn field_kind(&self, key: &str) -> Option<FieldKind> {
        self.form.schema().field_by_key(key).map(|f| f.kind)
    }

    fn draw_text_field(&self, f: &mut Frame<'_>, area: Rect, key: &'static str) {
        let [box_area, help_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Length(1)]).areas(area);
        let focused = self.focused() == Focus::Field(key);
        let label = match self.form.schema().field_by_key(key) {
            Some(field) if field.is_required() => format!("{} *", field.label),
            Some(field) => field.label.clone(),
            None => String::new(),
        };
        let error = self.form.error(key);

        let border = match (error, focused) {
            (Some(_), _) => self.theme.style(UiGroup::Error),
            (None, true) => self.theme.style(UiGroup::LabelFocused),
            (None, false) => self.theme.style(UiGroup::Border),
        };
        let value = if focused {
            self.editor.value()
        } else {
            self.form.value(key)
        };
        let input = Paragraph::new(value.to_string())
            .style(self.theme.style(UiGroup::Input))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {label} ")),
            );
        f.render_widget(input, box_area);
        if focused {
            let x = self.editor.visual_cursor() as u16 + 1;
            f.set_cursor_position((box_area.x + x.min(box_area.width.saturating_sub(2)), box_area.y + 1));
        }
        if let Some(msg) = error {
            f.render_widget(
                Paragraph::new(format!(" {msg}")).style(self.theme.style(UiGroup::Error)),
                help_area,
            );
        }
    }

    fn draw_checkbox(&self, f: &mut Frame<'_>, area: Rect, key: &'static str) {
        let focused = self.focused() == Focus::Field(key);
        let label = self
            .form
            .schema()
            .field_by_key(key)
            .map(|f| f.label.clone())
            .unwrap_or_default();
        let mark = if self.form.flag(key) { "[x]" } else { "[ ]" };
        let style = if focused {
            self.theme.style(UiGroup::LabelFocused)
        } else {
            self.theme.style(UiGroup::Label)
        };
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!(" {mark} "), style),
                Span::styled(label, style),
            ])),
            area,
        );
    }

    fn draw_submit(&self, f: &mut Frame<'_>, area: Rect) {
        let group = match (self.is_submit_enabled(), self.focused() == Focus::Submit) {
            (false, _) => UiGroup::ButtonDisabled,
            (true, true) => UiGroup::ButtonFocused,
            (true, false) => UiGroup::Button,
        };
        let button = Paragraph::new("Submit")
            .alignment(Alignment::Center)
            .style(self.theme.style(group));
        let [button_area] = Layout::horizontal([Constraint::Length(14)])
            .flex(ratatui::layout::Flex::Center)
            .areas(area);
        f.render_widget(button, button_area);
    }
}

impl Component for AddressForm {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.search.register_action_handler(tx)
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Some(EventResponse::Stop(Action::Quit)));
        }
        match key.code {
            KeyCode::Tab => {
                self.move_focus(true);
                return Ok(Some(EventResponse::Stop(Action::FocusNext)));
            }
            KeyCode::BackTab => {
                self.move_focus(false);
                return Ok(Some(EventResponse::Stop(Action::FocusPrev)));
            }
            _ => {}
        }

        let response = match self.focused() {
            Focus::Address => self.search.handle_key_events(key)?,
            Focus::Submit => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') if self.is_submit_enabled() => {
                    Some(EventResponse::Stop(Action::Submit))
                }
                _ => None,
            },
            Focus::Field(name) => match (self.field_kind(name), key.code) {
                (Some(FieldKind::Bool), KeyCode::Char(' ') | KeyCode::Enter) => {
                    self.form.toggle(name);
                    Some(EventResponse::Stop(Action::Render))
                }
                (Some(FieldKind::Bool), _) => None,
                (_, KeyCode::Enter) => {
                    self.move_focus(true);
                    Some(EventResponse::Stop(Action::FocusNext))
                }
                _ => {
                    if self
                        .editor
                        .handle_event(&crossterm::event::Event::Key(key))
                        .is_some()
                    {
                        self.form.set_value(name, self.editor.value().to_string());
                        self.form.touch(name);
                    }
                    Some(EventResponse::Stop(Action::Render))
                }
            },
        };
        Ok(response)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::LocationSelected(location) => self.apply_location(location),
            Action::LocationCleared => self.apply_location(SelectedLocation::default()),
            Action::Submit => {
                if let Err(err) = self.submit() {
                    return Ok(Some(Action::Error(format!("Submit failed: {err}"))));
                }
            }
            other => return self.search.update(other),
        }
        Ok(Some(Action::Render))
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        let (form_area, map_area) = if self.selected.is_selected() {
            let [l, r] = Layout::horizontal([Constraint::Max(60), Constraint::Fill(1)]).areas(area);
            (l, Some(r))
        } else {
            let [l] = Layout::horizontal([Constraint::Max(60)])
                .flex(ratatui::layout::Flex::Center)
                .areas(area);
            (l, None)
        };

        let frame = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.style(UiGroup::Border))
            .style(self.theme.style(UiGroup::Container))
            .title(format!(" {} ", self.form.schema().title));
        let inner = frame.inner(form_area);
        f.render_widget(frame, form_area);

        let address_height = 3 + self.search.dropdown_height().max(1);
        let rows = Layout::vertical([
            Constraint::Length(address_height),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

        let address_error = self.form.error(ADDRESS).map(str::to_string);
        self.search.draw_focused(
            f,
            rows[0],
            self.focused() == Focus::Address,
            address_error.as_deref(),
        );
        self.draw_text_field(f, rows[1], NAME);
        self.draw_text_field(f, rows[2], EMAIL);
        self.draw_checkbox(f, rows[3], INTERNET);
        self.draw_checkbox(f, rows[4], KITCHEN);
        self.draw_checkbox(f, rows[5], COFFEE);
        self.draw_text_field(f, rows[6], NUM_ROOM);
        self.draw_text_field(f, rows[7], DISTANCE);
        self.draw_submit(f, rows[8]);

        f.render_widget(
            Paragraph::new("Tab/Shift-Tab move · ↑/↓/Enter pick address · Esc clear · Ctrl-C quit")
                .style(self.theme.style(UiGroup::Dimmed)),
            rows[9],
        );

        if let Some(map_area) = map_area {
            self.preview.draw(f, map_area)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::search_field::tests::{FakeGeocoder, paris, record};
    use crate::form::{EMAIL_MESSAGE, NUMBER_MESSAGE};
    use crate::location::LatLon;
    use crate::theme::ColorMode;
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn form() -> (AddressForm, UnboundedReceiver<Action>) {
        let geo = FakeGeocoder::default()
            .answer("Paris", 0, vec![paris()])
            .answer("London", 0, vec![record("2", "London", "51.5", "-0.12")])
            .answer("Null Island", 0, vec![record("3", "Null Island", "0.0", "0.0")]);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut form = AddressForm::new(
            Arc::new(geo),
            Config::default(),
            Theme::with_mode(ColorMode::Ansi16),
        );
        form.register_action_handler(tx).unwrap();
        (form, rx)
    }

    /// Type `query` into the address field, wait for results, press Enter.
    async fn pick(form: &mut AddressForm, rx: &mut UnboundedReceiver<Action>, query: &str) {
        form.focus = 0;
        form.search.set_query(query);
        for _ in 0..2 {
            let action = rx.recv().await.unwrap();
            form.update(action).unwrap();
        }
        let response = form.handle_key_events(KeyEvent::from(KeyCode::Enter)).unwrap();
        let Some(EventResponse::Stop(action)) = response else {
            panic!("no selection for {query}: {response:?}");
        };
        form.update(action).unwrap();
    }

    fn fill_valid(form: &mut AddressForm) {
        form.set_field(NAME, "Jane");
        form.set_field(EMAIL, "jane@x.com");
        form.set_field(DISTANCE, "5");
    }

    #[test]
    fn empty_form_cannot_submit() {
        let (mut form, _rx) = form();
        assert!(!form.is_submit_enabled());
        assert!(form.preview().is_none());
        assert_eq!(form.submit().unwrap(), None);
        assert_eq!(form.form().error(NAME), None);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_paris_fills_address_and_mounts_preview() {
        let (mut form, mut rx) = form();

        pick(&mut form, &mut rx, "Paris").await;

        assert_eq!(form.form().value(ADDRESS), "Paris, France");
        assert_eq!(form.search().query(), "Paris, France");
        assert_eq!(
            form.selected_location(),
            &SelectedLocation {
                lat: "48.8566".into(),
                lon: "2.3522".into(),
                display_name: "Paris, France".into(),
            }
        );
        let preview = form.preview().unwrap();
        assert_eq!(preview.position(), LatLon::new(48.8566, 2.3522));
        assert_eq!(preview.mount_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reselecting_recenters_the_mounted_preview() {
        let (mut form, mut rx) = form();
        pick(&mut form, &mut rx, "Paris").await;
        pick(&mut form, &mut rx, "London").await;

        let preview = form.preview().unwrap();
        assert_eq!(preview.position(), LatLon::new(51.5, -0.12));
        assert_eq!(preview.mount_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_resets_selection_and_unmounts_preview() {
        let (mut form, mut rx) = form();
        pick(&mut form, &mut rx, "Paris").await;

        let response = form.handle_key_events(KeyEvent::from(KeyCode::Esc)).unwrap();
        assert_eq!(response, Some(EventResponse::Stop(Action::LocationCleared)));
        form.update(Action::LocationCleared).unwrap();

        assert_eq!(form.selected_location(), &SelectedLocation::default());
        assert!(form.preview().is_none());
        assert_eq!(form.form().value(ADDRESS), "");
        assert_eq!(form.form().error(ADDRESS), Some("Address is required"));
        assert_eq!(form.search().query(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn sentinel_coordinates_never_mount_the_preview() {
        let (mut form, mut rx) = form();
        pick(&mut form, &mut rx, "Null Island").await;

        assert_eq!(form.form().value(ADDRESS), "Null Island");
        assert!(form.preview().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_requires_every_mandatory_field() {
        let (mut form, mut rx) = form();
        fill_valid(&mut form);
        assert!(!form.is_submit_enabled());

        pick(&mut form, &mut rx, "Paris").await;
        assert!(form.is_submit_enabled());

        for key in [NAME, EMAIL, DISTANCE] {
            let before = form.form().value(key).to_string();
            form.set_field(key, "");
            assert!(!form.is_submit_enabled(), "{key} empty");
            form.set_field(key, &before);
        }

        form.set_field(EMAIL, "jane-at-x");
        assert!(!form.is_submit_enabled());
        assert_eq!(form.form().error(EMAIL), Some(EMAIL_MESSAGE));

        form.set_field(DISTANCE, "far");
        form.set_field(EMAIL, "jane@x.com");
        assert!(!form.is_submit_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn non_finite_distance_keeps_submit_disabled() {
        let (mut form, mut rx) = form();
        pick(&mut form, &mut rx, "Paris").await;
        fill_valid(&mut form);
        assert!(form.is_submit_enabled());

        for distance in ["inf", "NaN", "1e400"] {
            form.set_field(DISTANCE, distance);
            assert!(!form.is_submit_enabled(), "{distance}");
            assert_eq!(form.form().error(DISTANCE), Some(NUMBER_MESSAGE));
            assert_eq!(form.update(Action::Submit).unwrap(), Some(Action::Render));
            assert_eq!(form.last_submission(), None);
            assert_eq!(form.selected_location().display_name, "Paris, France");
        }

        form.set_field(NUM_ROOM, "inf");
        form.set_field(DISTANCE, "5");
        assert!(!form.is_submit_enabled());
        form.set_field(NUM_ROOM, "3");
        assert!(form.is_submit_enabled());
        form.update(Action::Submit).unwrap();
        assert_eq!(form.last_submission().map(|s| s.values.num_room), Some(Some(3.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn valid_submit_records_and_resets_everything() {
        let (mut form, mut rx) = form();
        pick(&mut form, &mut rx, "Paris").await;
        fill_valid(&mut form);
        form.toggle(KITCHEN);
        assert!(form.is_submit_enabled());

        form.focus = FOCUS_ORDER.len() - 1;
        let response = form.handle_key_events(KeyEvent::from(KeyCode::Enter)).unwrap();
        assert_eq!(response, Some(EventResponse::Stop(Action::Submit)));
        form.update(Action::Submit).unwrap();

        let submission = form.last_submission().cloned().unwrap();
        assert_eq!(
            submission.values,
            FormValues {
                address: "Paris, France".into(),
                name: "Jane".into(),
                email: "jane@x.com".into(),
                internet: false,
                kitchen: true,
                coffee: false,
                num_room: None,
                distance: 5.0,
            }
        );
        assert_eq!(submission.location.display_name, "Paris, France");

        assert!(!form.is_submit_enabled());
        assert_eq!(form.selected_location(), &SelectedLocation::default());
        assert!(form.preview().is_none());
        assert_eq!(form.search().query(), "");
        assert!(form.search().suggestions().is_empty());
        for key in [ADDRESS, NAME, EMAIL, NUM_ROOM, DISTANCE] {
            assert_eq!(form.form().value(key), "");
            assert_eq!(form.form().error(key), None);
        }
        assert!(!form.form().flag(KITCHEN));
    }

    #[test]
    fn typing_and_toggling_through_keys() {
        let (mut form, _rx) = form();
        form.handle_key_events(KeyEvent::from(KeyCode::Tab)).unwrap();
        for c in "Jane".chars() {
            form.handle_key_events(KeyEvent::from(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(form.form().value(NAME), "Jane");

        // email -> internet
        form.handle_key_events(KeyEvent::from(KeyCode::Tab)).unwrap();
        form.handle_key_events(KeyEvent::from(KeyCode::Tab)).unwrap();
        form.handle_key_events(KeyEvent::from(KeyCode::Char(' '))).unwrap();
        assert!(form.form().flag(INTERNET));
        assert_eq!(form.form().error(EMAIL), Some("Email is required"));

        form.handle_key_events(KeyEvent::from(KeyCode::BackTab)).unwrap();
        form.handle_key_events(KeyEvent::from(KeyCode::BackTab)).unwrap();
        assert_eq!(form.editor.value(), "Jane");

        form.focus = FOCUS_ORDER.len() - 1;
        let response = form.handle_key_events(KeyEvent::from(KeyCode::Enter)).unwrap();
        assert_eq!(response, None);
    }

    #[test]
    fn renders_without_preview_until_selection() {
        let (mut form, _rx) = form();
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                form.draw(f, area).unwrap();
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();

        assert!(text.contains(" Address Form "));
        assert!(text.contains("Coffee Machine"));
        assert!(text.contains(" Distance * "));
        assert!(text.contains(" Number of Rooms "));
        assert!(!text.contains("Number of Rooms *"));
        assert!(text.contains("Submit"));
        assert!(!text.contains("Loading map..."));
        assert!(!text.contains("openstreetmap"));
    }
}
