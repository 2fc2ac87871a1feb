use std::sync::Arc;

use color_eyre::Result;
use geocoding::Geocoder;
use ratatui::{Frame, prelude::Rect};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    action::Action,
    components::{Component, address_form::AddressForm},
    config::Config,
    theme::Theme,
    tui::{Event, EventResponse, Tui},
};

pub struct App {
    pub config: Config,
    pub tick_rate: f64,
    pub frame_rate: f64,
    pub form: AddressForm,
    pub should_quit: bool,
    pub should_suspend: bool,
}

impl App {
    pub fn new(config: Config, geocoder: Arc<dyn Geocoder>, tick_rate: f64, frame_rate: f64) -> Self {
        let form = AddressForm::new(geocoder, config.clone(), Theme::from_env_auto());
        Self {
            config,
            tick_rate,
            frame_rate,
            form,
            should_quit: false,
            should_suspend: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

        let mut tui = Tui::new()?
            .tick_rate(self.tick_rate)
            .frame_rate(self.frame_rate)
            .paste(true);
        tui.enter()?;

        self.form.register_action_handler(action_tx.clone())?;

        loop {
            if let Some(e) = tui.next().await {
                let stop_event_propagation = self
                    .form
                    .handle_events(e.clone())?
                    .map(|response| match response {
                        EventResponse::Continue(action) => {
                            action_tx.send(action).ok();
                            false
                        }
                        EventResponse::Stop(action) => {
                            action_tx.send(action).ok();
                            true
                        }
                    })
                    .unwrap_or(false);

                if !stop_event_propagation {
                    match e {
                        Event::Quit => action_tx.send(Action::Quit)?,
                        Event::Tick => action_tx.send(Action::Tick)?,
                        Event::Render => action_tx.send(Action::Render)?,
                        Event::Resize(x, y) => action_tx.send(Action::Resize(x, y))?,
                        _ => {}
                    }
                }
            }

            while let Ok(action) = action_rx.try_recv() {
                if action != Action::Tick && action != Action::Render {
                    debug!("{action:?}");
                }
                match action {
                    Action::Quit => self.should_quit = true,
                    Action::Suspend => self.should_suspend = true,
                    Action::Resume => self.should_suspend = false,
                    Action::Resize(w, h) => {
                        tui.resize(Rect::new(0, 0, w, h))?;
                        self.draw(&mut tui, &action_tx)?;
                    }
                    Action::Render => self.draw(&mut tui, &action_tx)?,
                    Action::Error(ref msg) => tracing::error!("{msg}"),
                    _ => {}
                }

                if let Some(action) = self.form.update(action.clone())? {
                    if action != Action::Render {
                        action_tx.send(action)?
                    }
                };
            }

            if self.should_suspend {
                tui.suspend()?;
                action_tx.send(Action::Resume)?;
                tui = Tui::new()?
                    .tick_rate(self.tick_rate)
                    .frame_rate(self.frame_rate)
                    .paste(true);
                tui.enter()?;
            } else if self.should_quit {
                tui.stop()?;
                break;
            }
        }
        tui.exit()?;
        Ok(())
    }

    fn draw(&mut self, tui: &mut Tui, action_tx: &mpsc::UnboundedSender<Action>) -> Result<()> {
        tui.draw(|f| {
            if let Err(err) = self.render(f) {
                action_tx
                    .send(Action::Error(format!("Failed to draw: {:?}", err)))
                    .ok();
            }
        })?;
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let area = frame.area();
        self.form.draw(frame, area)
    }
}
