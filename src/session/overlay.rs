use std::time::Duration as StdDuration;

use chrono::Duration;
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Position, Rect, Size},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use tokio::time::Instant;
use tracing::debug;

use crate::utils::time::format_elapsed;

/// How long a milestone banner stays at full strength before it starts
/// fading, and how long the fade lasts.
pub const BANNER_VISIBLE_FOR: StdDuration = StdDuration::from_millis(1000);
pub const BANNER_FADE_FOR: StdDuration = StdDuration::from_millis(300);

/// The time text never shrinks the box below this many columns.
const MIN_TIME_WIDTH: u16 = 6;

/// Everything the overlay draws: the elapsed time in its movable box and an
/// optional milestone banner. Screen-independent state only, so the same
/// overlay renders into any viewport and survives resizes.
pub struct OverlayState {
    elapsed: Duration,
    /// Explicit position once the user has dragged the box. Until then the
    /// box stays anchored to the top right corner of whatever viewport it is
    /// drawn into.
    position: Option<(u16, u16)>,
    drag: Option<DragGrip>,
    drag_moved: bool,
    banner: Option<Banner>,
}

/// Where inside the box the drag grabbed it, so the box moves with the
/// pointer instead of jumping to it.
#[derive(Clone, Copy)]
struct DragGrip {
    dx: u16,
    dy: u16,
}

struct Banner {
    text: String,
    shown_at: Instant,
}

impl OverlayState {
    pub fn new() -> Self {
        Self {
            elapsed: Duration::zero(),
            position: None,
            drag: None,
            drag_moved: false,
            banner: None,
        }
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// Shows a banner, replacing any banner that is still on screen.
    pub fn show_banner(&mut self, text: String, now: Instant) {
        self.banner = Some(Banner {
            text,
            shown_at: now,
        });
    }

    /// Next moment the banner changes appearance: the start of the fade, then
    /// the removal. None while no banner is up.
    pub fn banner_deadline(&self, now: Instant) -> Option<Instant> {
        let banner = self.banner.as_ref()?;
        let fade_at = banner.shown_at + BANNER_VISIBLE_FOR;
        let gone_at = fade_at + BANNER_FADE_FOR;
        Some(if now < fade_at { fade_at } else { gone_at })
    }

    /// Drops the banner once its fade has finished.
    pub fn expire_banner(&mut self, now: Instant) {
        if let Some(banner) = &self.banner {
            if now >= banner.shown_at + BANNER_VISIBLE_FOR + BANNER_FADE_FOR {
                self.banner = None;
            }
        }
    }

    pub fn on_mouse(&mut self, event: MouseEvent, viewport: Size) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let rect = self.box_rect(viewport);
                if rect.contains(Position::new(event.column, event.row)) {
                    self.drag = Some(DragGrip {
                        dx: event.column - rect.x,
                        dy: event.row - rect.y,
                    });
                    self.drag_moved = false;
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(grip) = self.drag {
                    self.drag_moved = true;
                    let x = i32::from(event.column) - i32::from(grip.dx);
                    let y = i32::from(event.row) - i32::from(grip.dy);
                    self.position = Some(clamp_offsets(x, y, viewport, self.box_size()));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag.take().is_some() && self.drag_moved {
                    // The release that ends a drag is not a click on the box.
                    debug!("Finished dragging the timer box");
                }
            }
            _ => {}
        }
    }

    /// Pulls a dragged box back inside the viewport. Called when the terminal
    /// shrinks under the overlay.
    pub fn clamp_into(&mut self, viewport: Size) {
        if let Some((x, y)) = self.position {
            self.position = Some(clamp_offsets(
                i32::from(x),
                i32::from(y),
                viewport,
                self.box_size(),
            ));
        }
    }

    pub fn box_rect(&self, viewport: Size) -> Rect {
        let size = self.box_size();
        let (x, y) = match self.position {
            Some((x, y)) => clamp_offsets(i32::from(x), i32::from(y), viewport, size),
            None => (viewport.width.saturating_sub(size.width + 1), 0),
        };
        Rect::new(
            x,
            y,
            size.width.min(viewport.width),
            size.height.min(viewport.height),
        )
    }

    fn box_size(&self) -> Size {
        let text_width = format_elapsed(self.elapsed).len() as u16;
        Size::new(text_width.max(MIN_TIME_WIDTH) + 4, 3)
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_offsets(x: i32, y: i32, viewport: Size, size: Size) -> (u16, u16) {
    let max_x = i32::from(viewport.width.saturating_sub(size.width));
    let max_y = i32::from(viewport.height.saturating_sub(size.height));
    (x.clamp(0, max_x) as u16, y.clamp(0, max_y) as u16)
}

pub fn render(frame: &mut Frame, state: &OverlayState, now: Instant) {
    render_timer_box(frame, state);
    render_help_line(frame);
    if let Some(banner) = &state.banner {
        render_banner(frame, banner, now);
    }
}

fn render_timer_box(frame: &mut Frame, state: &OverlayState) {
    let rect = state.box_rect(frame.area().as_size());
    let text = format_elapsed(state.elapsed);
    let block = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(text).centered().block(block), rect);
}

fn render_help_line(frame: &mut Frame) {
    let area = frame.area();
    if area.height < 2 {
        return;
    }

    let help = Paragraph::new("q to quit, drag the timer with the mouse")
        .style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(help, Rect::new(0, area.height - 1, area.width, 1));
}

fn render_banner(frame: &mut Frame, banner: &Banner, now: Instant) {
    let area = frame.area();
    let width = (banner.text.len() as u16 + 6).min(area.width);
    let y = if area.height > 4 { 1 } else { 0 };
    let rect = Rect::new(
        area.width.saturating_sub(width) / 2,
        y,
        width,
        3.min(area.height),
    );

    let style = if now >= banner.shown_at + BANNER_VISIBLE_FOR {
        Style::default().fg(Color::DarkGray).bg(Color::Black)
    } else {
        Style::default()
            .fg(Color::White)
            .bg(Color::Black)
            .add_modifier(Modifier::BOLD)
    };

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(banner.text.as_str())
            .centered()
            .block(Block::default().borders(Borders::ALL).style(style)),
        rect,
    );
}
