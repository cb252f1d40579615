use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyModifiers};
use futures::{stream, Stream, StreamExt};
use lifecycle::{SessionAction, SessionLifecycle};
use milestone::MilestoneTracker;
use overlay::OverlayState;
use ratatui::{backend::Backend, Terminal};
use suspend::{Visibility, VisibilitySignals};
use terminal::TtyGuard;
use tokio_util::sync::CancellationToken;
use tracker::DomainTimer;
use tracing::{debug, error, info, warn};

use crate::{
    storage::store::{JsonTimerStore, TimerStore},
    utils::clock::{Clock, DefaultClock},
};

pub mod lifecycle;
pub mod milestone;
pub mod overlay;
pub mod shutdown;
pub mod suspend;
pub mod terminal;
pub mod tracker;

/// The displayed time recomputes once a second.
pub const DISPLAY_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
/// Periodic flush, bounding what an abrupt kill can lose.
pub const SAVE_INTERVAL: Duration = Duration::from_secs(10);
/// Cadence of the self-heal pass that re-clamps and repaints the overlay.
pub const HEAL_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Everything that can wake the session besides its own timers.
pub enum SessionEvent {
    Input(Event),
    Visibility(Visibility),
}

/// Represents the starting point for a watch session. Takes over the
/// terminal, runs until asked to quit, and hands the terminal back.
pub async fn run_session(domain: Arc<str>, state_path: PathBuf) -> Result<()> {
    let store = JsonTimerStore::new(state_path)?;
    let signals = VisibilitySignals::install()?;
    let (tty, terminal) = TtyGuard::install()?;

    let shutdown_token = CancellationToken::new();
    let session = create_session(
        domain,
        store,
        terminal,
        Some(tty),
        &shutdown_token,
        DefaultClock,
    );

    let (_, session_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        session.run(session_events(signals)),
    );

    if let Err(e) = &session_result {
        error!("Session ended with an error {e:?}");
    }

    session_result
}

fn create_session<B: Backend, S: TimerStore>(
    domain: Arc<str>,
    store: S,
    terminal: Terminal<B>,
    tty: Option<TtyGuard>,
    shutdown_token: &CancellationToken,
    clock: impl Clock + Clone,
) -> Session<B, S> {
    Session {
        domain: domain.clone(),
        tracker: DomainTimer::new(domain, store, Box::new(clock.clone())),
        milestones: MilestoneTracker::new(),
        lifecycle: SessionLifecycle::new(true),
        overlay: OverlayState::new(),
        terminal,
        tty,
        clock: Box::new(clock),
        shutdown: shutdown_token.clone(),
    }
}

/// Terminal input and job-control signals merged into one stream.
fn session_events(signals: VisibilitySignals) -> impl Stream<Item = SessionEvent> + Unpin {
    let input = EventStream::new().filter_map(|event| async move {
        match event {
            Ok(event) => Some(SessionEvent::Input(event)),
            Err(e) => {
                warn!("Couldn't read a terminal event: {e}");
                None
            }
        }
    });

    let visibility = stream::unfold(signals, |mut signals| async move {
        let change = signals.next_change().await;
        Some((SessionEvent::Visibility(change), signals))
    });

    stream::select(input, visibility).boxed()
}

/// One watch session: the timer for one domain wired to one terminal.
struct Session<B: Backend, S: TimerStore> {
    domain: Arc<str>,
    tracker: DomainTimer<S>,
    milestones: MilestoneTracker,
    lifecycle: SessionLifecycle,
    overlay: OverlayState,
    terminal: Terminal<B>,
    tty: Option<TtyGuard>,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
}

enum Wake {
    Shutdown,
    Display,
    Save,
    Heal,
    Banner,
    Event(Option<SessionEvent>),
}

impl<B: Backend, S: TimerStore> Session<B, S> {
    async fn run(mut self, events: impl Stream<Item = SessionEvent> + Unpin) -> Result<()> {
        let record = self.tracker.initialize_session();
        info!(
            "Watching {} with {}ms already on the clock for {}",
            self.domain,
            record.total_time.num_milliseconds(),
            record.date,
        );

        let result = self.event_loop(events).await;

        self.apply_action(self.lifecycle.unload());
        debug!("Final flush done for {}", self.domain);

        if let Some(tty) = &self.tty {
            tty.restore()?;
            self.terminal.show_cursor()?;
        }

        result
    }

    async fn event_loop(
        &mut self,
        mut events: impl Stream<Item = SessionEvent> + Unpin,
    ) -> Result<()> {
        self.refresh_display();
        self.draw()?;

        let mut next_display = self.clock.instant() + DISPLAY_REFRESH_INTERVAL;
        let mut next_save = self.clock.instant() + SAVE_INTERVAL;
        let mut next_heal = self.clock.instant() + HEAL_CHECK_INTERVAL;
        let mut events_done = false;

        loop {
            let banner_deadline = self.overlay.banner_deadline(self.clock.instant());

            let wake = tokio::select! {
                _ = self.shutdown.cancelled() => Wake::Shutdown,
                _ = self.clock.sleep_until(next_display) => Wake::Display,
                _ = self.clock.sleep_until(next_save) => Wake::Save,
                _ = self.clock.sleep_until(next_heal) => Wake::Heal,
                _ = self.clock.sleep_until(banner_deadline.unwrap_or_else(|| self.clock.instant())),
                    if banner_deadline.is_some() => Wake::Banner,
                event = events.next(), if !events_done => Wake::Event(event),
            };

            // Deadlines re-arm from now rather than stepping forward, so a
            // long suspension doesn't replay a backlog of ticks on resume.
            match wake {
                Wake::Shutdown => return Ok(()),
                Wake::Display => {
                    next_display = self.clock.instant() + DISPLAY_REFRESH_INTERVAL;
                    self.refresh_display();
                }
                Wake::Save => {
                    next_save = self.clock.instant() + SAVE_INTERVAL;
                    self.tracker.flush();
                }
                Wake::Heal => {
                    next_heal = self.clock.instant() + HEAL_CHECK_INTERVAL;
                    self.ensure_attached()?;
                }
                Wake::Banner => {
                    self.overlay.expire_banner(self.clock.instant());
                }
                Wake::Event(Some(event)) => self.handle_event(event)?,
                Wake::Event(None) => {
                    warn!("Event stream ended before shutdown");
                    events_done = true;
                }
            }

            self.draw()?;
        }
    }

    fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Input(Event::Key(key)) => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    info!("Quit requested");
                    self.shutdown.cancel();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    info!("Quit requested");
                    self.shutdown.cancel();
                }
                #[cfg(unix)]
                KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    // Raw mode swallows the job-control keystroke, so the
                    // session suspends itself.
                    self.go_hidden()?;
                }
                _ => {}
            },
            SessionEvent::Input(Event::FocusGained) => {
                debug!("Terminal focus gained");
                self.apply_action(self.lifecycle.focus_gained());
            }
            SessionEvent::Input(Event::FocusLost) => {
                debug!("Terminal focus lost");
                self.apply_action(self.lifecycle.focus_lost());
            }
            SessionEvent::Input(Event::Mouse(mouse)) => {
                let viewport = self.terminal.size()?;
                self.overlay.on_mouse(mouse, viewport);
            }
            SessionEvent::Input(Event::Resize(_, _)) => self.ensure_attached()?,
            SessionEvent::Input(_) => {}
            SessionEvent::Visibility(Visibility::Hidden) => self.go_hidden()?,
            SessionEvent::Visibility(Visibility::Visible) => self.go_visible()?,
        }
        Ok(())
    }

    fn apply_action(&mut self, action: SessionAction) {
        match action {
            SessionAction::Flush => {
                self.tracker.flush();
            }
            SessionAction::Restart => {
                self.tracker.flush();
                self.tracker.initialize_session();
            }
        }
    }

    fn refresh_display(&mut self) {
        let elapsed = self.tracker.current_elapsed();
        self.overlay.set_elapsed(elapsed);

        if let Some(minutes) = self.milestones.check(elapsed) {
            info!("{} has been in use for {minutes} minutes today", self.domain);
            self.overlay.show_banner(
                format!("Used {minutes} minutes on {}", self.domain),
                self.clock.instant(),
            );
        }
    }

    /// The terminal analogue of the page going hidden: settle the books and
    /// give the terminal back before the process stops.
    fn go_hidden(&mut self) -> Result<()> {
        if let Some(action) = self.lifecycle.visibility_changed(false) {
            self.apply_action(action);
        }
        info!("Session hidden, suspending");
        if let Some(tty) = &self.tty {
            tty.suspend()?;
        }
        Ok(())
    }

    fn go_visible(&mut self) -> Result<()> {
        if let Some(tty) = &self.tty {
            tty.resume()?;
        }
        if let Some(action) = self.lifecycle.visibility_changed(true) {
            self.apply_action(action);
        }
        info!("Session visible again");
        self.ensure_attached()
    }

    /// The self-heal pass. Pulls a dragged box back inside the real viewport
    /// and forces a full repaint, recovering from anything that scribbled
    /// over the screen.
    fn ensure_attached(&mut self) -> Result<()> {
        let viewport = self.terminal.size()?;
        self.overlay.clamp_into(viewport);
        self.terminal.clear()?;
        debug!("Reattached the overlay");
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let now = self.clock.instant();
        let Session {
            terminal, overlay, ..
        } = self;
        terminal.draw(|frame| overlay::render(frame, overlay, now))?;
        Ok(())
    }
}
