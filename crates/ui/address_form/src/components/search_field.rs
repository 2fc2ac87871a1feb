//! Address autocomplete field.
//!
//! Every query change restarts a debounce timer. When the timer fires, one
//! lookup is started on a tokio task, bounded by the configured timeout. Timer
//! and lookup report back through the action channel; each message carries a
//! ticket / sequence number so that only the newest timer and the newest lookup
//! can touch the visible state.

use std::{sync::Arc, time::Duration};

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use geocoding::{Geocoder, GeocodeError, NO_RESULTS_MESSAGE, SuggestionRecord, TIMEOUT_MESSAGE};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, trace};
use tui_input::{Input, backend::crossterm::EventHandler};

use super::Component;
use crate::{
    action::{Action, LookupFailure, LookupOutcome},
    config::GeocodingConfig,
    location::SelectedLocation,
    theme::{Theme, UiGroup},
    tui::EventResponse,
};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub limit: usize,
    pub debounce: Duration,
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from(&GeocodingConfig::default())
    }
}

impl From<&GeocodingConfig> for SearchSettings {
    fn from(cfg: &GeocodingConfig) -> Self {
        Self {
            limit: cfg.limit,
            debounce: cfg.debounce(),
            timeout: cfg.timeout(),
        }
    }
}

impl From<GeocodeError> for LookupFailure {
    fn from(err: GeocodeError) -> Self {
        if err.is_timeout() {
            LookupFailure::TimedOut
        } else {
            LookupFailure::Failed(err.to_string())
        }
    }
}

impl LookupFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            LookupFailure::TimedOut => TIMEOUT_MESSAGE,
            LookupFailure::Failed(_) => NO_RESULTS_MESSAGE,
        }
    }
}

pub struct AddressSearchField {
    geocoder: Arc<dyn Geocoder>,
    settings: SearchSettings,
    theme: Theme,
    action_tx: Option<UnboundedSender<Action>>,
    input: Input,
    suggestions: Vec<SuggestionRecord>,
    highlighted: Option<usize>,
    loading: bool,
    error: Option<String>,
    debounce: Option<JoinHandle<()>>,
    ticket: u64,
    request: Option<JoinHandle<()>>,
    seq: u64,
    spinner: usize,
}

impl AddressSearchField {
    pub fn new(geocoder: Arc<dyn Geocoder>, settings: SearchSettings, theme: Theme) -> Self {
        Self {
            geocoder,
            settings,
            theme,
            action_tx: None,
            input: Input::default(),
            suggestions: Vec::new(),
            highlighted: None,
            loading: false,
            error: None,
            debounce: None,
            ticket: 0,
            request: None,
            seq: 0,
            spinner: 0,
        }
    }

    pub fn query(&self) -> &str {
        self.input.value()
    }

    pub fn suggestions(&self) -> &[SuggestionRecord] {
        &self.suggestions
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the query as if typed and react to the change.
    pub fn set_query(&mut self, query: &str) {
        if query == self.input.value() {
            return;
        }
        self.input = Input::default().with_value(query.to_string());
        self.on_query_changed();
    }

    fn on_query_changed(&mut self) {
        self.cancel_debounce();
        self.highlighted = None;

        if self.input.value().trim().is_empty() {
            self.suggestions.clear();
            self.invalidate_lookup();
            return;
        }

        self.ticket += 1;
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        let ticket = self.ticket;
        let delay = self.settings.debounce;
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Action::DebounceElapsed(ticket));
        }));
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }

    /// Abort the running lookup and make any result still in flight stale.
    fn invalidate_lookup(&mut self) {
        if let Some(handle) = self.request.take() {
            handle.abort();
        }
        self.seq += 1;
        self.loading = false;
    }

    fn begin_lookup(&mut self) {
        self.invalidate_lookup();
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        self.loading = true;
        self.error = None;

        let seq = self.seq;
        let query = self.input.value().to_string();
        let geocoder = self.geocoder.clone();
        let SearchSettings { limit, timeout, .. } = self.settings.clone();
        debug!(seq, %query, "starting lookup");

        self.request = Some(tokio::spawn(async move {
            let outcome: LookupOutcome =
                geocoding::search_with_timeout(geocoder.as_ref(), &query, limit, timeout)
                    .await
                    .map_err(LookupFailure::from);
            let _ = tx.send(Action::LookupSettled { seq, outcome });
        }));
    }

    fn settle(&mut self, seq: u64, outcome: LookupOutcome) {
        if seq != self.seq {
            trace!(seq, current = self.seq, "discarding stale lookup result");
            return;
        }
        self.request = None;
        self.loading = false;
        match outcome {
            Ok(suggestions) => {
                debug!(seq, count = suggestions.len(), "lookup settled");
                self.suggestions = suggestions;
            }
            Err(failure) => {
                debug!(seq, ?failure, "lookup failed");
                self.error = Some(failure.user_message().to_string());
                self.suggestions.clear();
            }
        }
        self.highlighted = None;
    }

    /// Pick suggestion `idx`: the query shows its label, the list closes.
    ///
    /// Filling in the label does not start another lookup.
    pub fn select(&mut self, idx: usize) -> Option<SelectedLocation> {
        let picked = self.suggestions.get(idx)?.clone();
        self.cancel_debounce();
        self.invalidate_lookup();
        self.input = Input::default().with_value(picked.label.clone());
        self.suggestions.clear();
        self.highlighted = None;
        Some(SelectedLocation::from_suggestion(&picked))
    }

    /// Drop the query and any pending work; yields the "no selection" value.
    pub fn clear(&mut self) -> SelectedLocation {
        self.cancel_debounce();
        self.invalidate_lookup();
        self.input.reset();
        self.suggestions.clear();
        self.highlighted = None;
        self.error = None;
        SelectedLocation::default()
    }

    fn move_highlight(&mut self, down: bool) {
        if self.suggestions.is_empty() {
            return;
        }
        let last = self.suggestions.len() - 1;
        self.highlighted = Some(match (self.highlighted, down) {
            (None, true) => 0,
            (None, false) => last,
            (Some(i), true) => (i + 1).min(last),
            (Some(i), false) => i.saturating_sub(1),
        });
    }

    /// Rows needed below the input line.
    pub fn dropdown_height(&self) -> u16 {
        let helper = u16::from(self.error.is_some());
        self.suggestions.len() as u16 + helper
    }

    pub fn draw_focused(&mut self, f: &mut Frame<'_>, area: Rect, focused: bool, field_error: Option<&str>) {
        let [input_area, below] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);

        let label_style = if focused {
            self.theme.style(UiGroup::LabelFocused)
        } else {
            self.theme.style(UiGroup::Label)
        };
        let mut title = vec![Span::styled(" Address ", label_style)];
        if self.loading {
            title.push(Span::styled(
                format!("{} ", SPINNER[self.spinner % SPINNER.len()]),
                self.theme.style(UiGroup::Dimmed),
            ));
        }
        let border = if field_error.is_some() {
            self.theme.style(UiGroup::Error)
        } else if focused {
            self.theme.style(UiGroup::LabelFocused)
        } else {
            self.theme.style(UiGroup::Border)
        };
        let width = input_area.width.saturating_sub(3) as usize;
        let scroll = self.input.visual_scroll(width);
        let input = Paragraph::new(self.input.value())
            .style(self.theme.style(UiGroup::Input))
            .scroll((0, scroll as u16))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(Line::from(title)),
            );
        f.render_widget(input, input_area);
        if focused {
            let x = self.input.visual_cursor().max(scroll) - scroll + 1;
            f.set_cursor_position((input_area.x + x as u16, input_area.y + 1));
        }

        let mut rows: Vec<ListItem> = self
            .suggestions
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let style = if Some(i) == self.highlighted {
                    self.theme.style(UiGroup::SuggestionHighlighted)
                } else {
                    self.theme.style(UiGroup::Suggestion)
                };
                ListItem::new(format!("  {}", s.label)).style(style)
            })
            .collect();
        if let Some(msg) = field_error.or(self.error.as_deref()) {
            rows.push(ListItem::new(format!("  {msg}")).style(self.theme.style(UiGroup::Error)));
        }
        f.render_widget(List::new(rows), below);
    }
}

impl Drop for AddressSearchField {
    fn drop(&mut self) {
        self.cancel_debounce();
        if let Some(handle) = self.request.take() {
            handle.abort();
        }
    }
}

impl Component for AddressSearchField {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(tx);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let response = match key.code {
            KeyCode::Down => {
                self.move_highlight(true);
                Some(EventResponse::Stop(Action::Render))
            }
            KeyCode::Up => {
                self.move_highlight(false);
                Some(EventResponse::Stop(Action::Render))
            }
            KeyCode::Enter => {
                let idx = self.highlighted.or((!self.suggestions.is_empty()).then_some(0));
                idx.and_then(|i| self.select(i))
                    .map(|loc| EventResponse::Stop(Action::LocationSelected(loc)))
            }
            KeyCode::Esc => {
                self.clear();
                Some(EventResponse::Stop(Action::LocationCleared))
            }
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&crossterm::event::Event::Key(key));
                if self.input.value() != before {
                    self.on_query_changed();
                }
                Some(EventResponse::Stop(Action::Render))
            }
        };
        Ok(response)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::Tick if self.loading => self.spinner = self.spinner.wrapping_add(1),
            Action::DebounceElapsed(ticket) if ticket == self.ticket => {
                self.debounce = None;
                if !self.input.value().trim().is_empty() {
                    self.begin_lookup();
                }
            }
            Action::DebounceElapsed(ticket) => trace!(ticket, "ignoring stale debounce timer"),
            Action::LookupSettled { seq, outcome } => self.settle(seq, outcome),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        self.draw_focused(f, area, true, None);
        Ok(())
    }
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use std::{collections::HashMap, sync::Mutex};
    use tokio::{
        sync::mpsc::{self, UnboundedReceiver},
        time::Instant,
    };

    type Answer = (Duration, Result<Vec<SuggestionRecord>, ()>);

    /// Scripted geocoder: per-query delay and answer, records every call.
    #[derive(Default)]
    pub(crate) struct FakeGeocoder {
        calls: Mutex<Vec<String>>,
        answers: HashMap<String, Answer>,
    }

    impl FakeGeocoder {
        pub(crate) fn answer(mut self, query: &str, delay_ms: u64, records: Vec<SuggestionRecord>) -> Self {
            self.answers
                .insert(query.into(), (Duration::from_millis(delay_ms), Ok(records)));
            self
        }

        pub(crate) fn fail(mut self, query: &str, delay_ms: u64) -> Self {
            self.answers
                .insert(query.into(), (Duration::from_millis(delay_ms), Err(())));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Geocoder for FakeGeocoder {
        fn search<'a>(
            &'a self,
            query: &'a str,
            _limit: usize,
        ) -> BoxFuture<'a, Result<Vec<SuggestionRecord>, GeocodeError>> {
            self.calls.lock().unwrap().push(query.to_string());
            Box::pin(async move {
                let (delay, answer) = self
                    .answers
                    .get(query)
                    .cloned()
                    .unwrap_or((Duration::ZERO, Ok(vec![])));
                tokio::time::sleep(delay).await;
                answer.map_err(|_| {
                    GeocodeError::from(serde_json::from_str::<Vec<u8>>("{").unwrap_err())
                })
            })
        }
    }

    pub(crate) fn record(key: &str, label: &str, lat: &str, lon: &str) -> SuggestionRecord {
        SuggestionRecord {
            key: key.into(),
            label: label.into(),
            value: label.into(),
            lat: lat.into(),
            lon: lon.into(),
        }
    }

    pub(crate) fn paris() -> SuggestionRecord {
        record("1", "Paris, France", "48.8566", "2.3522")
    }

    fn london() -> SuggestionRecord {
        record("2", "London, United Kingdom", "51.5", "-0.12")
    }

    fn field(
        geo: FakeGeocoder,
    ) -> (AddressSearchField, Arc<FakeGeocoder>, UnboundedReceiver<Action>) {
        let geo = Arc::new(geo);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut f = AddressSearchField::new(geo.clone(), SearchSettings::default(), Theme::default());
        f.register_action_handler(tx).unwrap();
        (f, geo, rx)
    }

    /// Receive the next action and feed it back, like the app loop does.
    async fn pump(f: &mut AddressSearchField, rx: &mut UnboundedReceiver<Action>) -> Action {
        let action = rx.recv().await.unwrap();
        f.update(action.clone()).unwrap();
        action
    }

    async fn assert_quiet(rx: &mut UnboundedReceiver<Action>) {
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_waits_for_the_debounce_window() {
        let (mut f, geo, mut rx) = field(FakeGeocoder::default().answer("Paris", 50, vec![paris()]));

        let start = Instant::now();
        f.set_query("Paris");
        let action = pump(&mut f, &mut rx).await;

        assert_eq!(action, Action::DebounceElapsed(1));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(f.is_loading());

        let action = pump(&mut f, &mut rx).await;
        assert!(matches!(action, Action::LookupSettled { .. }));
        assert!(!f.is_loading());
        assert_eq!(geo.calls(), vec!["Paris".to_string()]);
        assert_eq!(f.suggestions(), &[paris()]);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_issues_one_request_for_the_last_query() {
        let (mut f, geo, mut rx) = field(FakeGeocoder::default().answer("Paris", 50, vec![paris()]));

        f.set_query("P");
        tokio::time::sleep(Duration::from_millis(200)).await;
        f.set_query("Par");
        tokio::time::sleep(Duration::from_millis(499)).await;
        let start = Instant::now();
        f.set_query("Paris");

        assert_eq!(pump(&mut f, &mut rx).await, Action::DebounceElapsed(3));
        assert!(start.elapsed() >= Duration::from_millis(500));
        pump(&mut f, &mut rx).await;

        assert_eq!(geo.calls(), vec!["Paris".to_string()]);
        assert_eq!(f.suggestions(), &[paris()]);
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn whitespace_query_clears_without_request() {
        let (mut f, geo, mut rx) = field(FakeGeocoder::default().answer("Paris", 0, vec![paris()]));
        f.set_query("Paris");
        pump(&mut f, &mut rx).await;
        pump(&mut f, &mut rx).await;
        assert_eq!(f.suggestions().len(), 1);

        f.set_query("   ");

        assert!(f.suggestions().is_empty());
        assert!(!f.is_loading());
        assert_quiet(&mut rx).await;
        assert_eq!(geo.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn emptying_the_query_mid_flight_drops_the_result() {
        let (mut f, _geo, mut rx) = field(FakeGeocoder::default().answer("Paris", 2_000, vec![paris()]));
        f.set_query("Paris");
        pump(&mut f, &mut rx).await;
        assert!(f.is_loading());

        f.set_query("");

        assert!(!f.is_loading());
        assert_quiet(&mut rx).await;
        assert!(f.suggestions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_supersedes_older_one() {
        let geo = FakeGeocoder::default()
            .answer("slow", 3_000, vec![london()])
            .answer("fast", 10, vec![paris()]);
        let (mut f, geo, mut rx) = field(geo);

        f.set_query("slow");
        pump(&mut f, &mut rx).await;
        f.set_query("fast");
        assert_eq!(pump(&mut f, &mut rx).await, Action::DebounceElapsed(2));
        pump(&mut f, &mut rx).await;

        assert_eq!(f.suggestions(), &[paris()]);
        assert_quiet(&mut rx).await;
        assert_eq!(f.suggestions(), &[paris()]);
        assert_eq!(geo.calls(), vec!["slow".to_string(), "fast".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_messages_are_ignored() {
        let (mut f, _geo, mut rx) = field(FakeGeocoder::default().answer("Paris", 100, vec![paris()]));
        f.set_query("Paris");
        pump(&mut f, &mut rx).await;

        f.update(Action::DebounceElapsed(99)).unwrap();
        f.update(Action::LookupSettled {
            seq: 0,
            outcome: Ok(vec![london()]),
        })
        .unwrap();
        assert!(f.suggestions().is_empty());
        assert!(f.is_loading());

        pump(&mut f, &mut rx).await;
        assert_eq!(f.suggestions(), &[paris()]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out_with_its_own_message() {
        let (mut f, _geo, mut rx) = field(FakeGeocoder::default().answer("Paris", 30_000, vec![paris()]));
        f.set_query("Paris");
        pump(&mut f, &mut rx).await;
        let start = Instant::now();

        let action = pump(&mut f, &mut rx).await;

        assert!(matches!(
            action,
            Action::LookupSettled { outcome: Err(LookupFailure::TimedOut), .. }
        ));
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(11));
        assert_eq!(f.error(), Some(TIMEOUT_MESSAGE));
        assert!(f.suggestions().is_empty());
        assert!(!f.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lookup_clears_list_with_generic_message() {
        let geo = FakeGeocoder::default()
            .answer("Paris", 0, vec![paris()])
            .fail("Nowhere", 0);
        let (mut f, _geo, mut rx) = field(geo);
        f.set_query("Paris");
        pump(&mut f, &mut rx).await;
        pump(&mut f, &mut rx).await;

        f.set_query("Nowhere");
        pump(&mut f, &mut rx).await;
        pump(&mut f, &mut rx).await;

        assert_eq!(f.error(), Some(NO_RESULTS_MESSAGE));
        assert!(f.suggestions().is_empty());

        f.set_query("Paris");
        pump(&mut f, &mut rx).await;
        assert_eq!(f.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn keyboard_selection_reports_location_without_new_lookup() {
        let (mut f, geo, mut rx) =
            field(FakeGeocoder::default().answer("Par", 0, vec![paris(), london()]));
        for c in "Par".chars() {
            f.handle_key_events(KeyEvent::from(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(f.query(), "Par");
        pump(&mut f, &mut rx).await;
        pump(&mut f, &mut rx).await;

        f.handle_key_events(KeyEvent::from(KeyCode::Down)).unwrap();
        f.handle_key_events(KeyEvent::from(KeyCode::Down)).unwrap();
        f.handle_key_events(KeyEvent::from(KeyCode::Down)).unwrap();
        assert_eq!(f.highlighted(), Some(1));
        f.handle_key_events(KeyEvent::from(KeyCode::Up)).unwrap();
        let response = f.handle_key_events(KeyEvent::from(KeyCode::Enter)).unwrap();

        let expected = SelectedLocation {
            lat: "48.8566".into(),
            lon: "2.3522".into(),
            display_name: "Paris, France".into(),
        };
        assert_eq!(response, Some(EventResponse::Stop(Action::LocationSelected(expected))));
        assert_eq!(f.query(), "Paris, France");
        assert!(f.suggestions().is_empty());
        assert_quiet(&mut rx).await;
        assert_eq!(geo.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn escape_clears_query_and_reports_sentinel() {
        let (mut f, _geo, mut rx) = field(FakeGeocoder::default().answer("Paris", 0, vec![paris()]));
        f.set_query("Paris");
        pump(&mut f, &mut rx).await;
        pump(&mut f, &mut rx).await;
        assert_eq!(f.select(0).map(|l| l.is_selected()), Some(true));

        let response = f.handle_key_events(KeyEvent::from(KeyCode::Esc)).unwrap();

        assert_eq!(response, Some(EventResponse::Stop(Action::LocationCleared)));
        assert_eq!(f.query(), "");
        assert!(!f.clear().is_selected());
    }
}
