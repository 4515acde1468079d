//! Logical slide-index state machine behind the news carousel.
//!
//! The only persisted state is the active index. Everything that moves it
//! (buttons, dots, arrow keys, drag gestures, the autoplay timer) arrives
//! as a [`CarouselEvent`] and yields at most one [`Transition`]. Animation
//! is the renderer's business; [`Direction`] exists only so it knows which
//! way to slide.
//!
//! Time is passed in explicitly, so the machine runs the same under a real
//! clock, a paused test clock, or no runtime at all.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CarouselConfig {
    /// Autoplay interval; `0` disables autoplay.
    pub autoplay_ms: u64,
    /// Horizontal drag distance that commits a slide change.
    pub drag_offset_px: f64,
    /// Release velocity (px/s) that commits a slide change.
    pub drag_velocity_px: f64,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            autoplay_ms: 6000,
            drag_offset_px: 60.0,
            drag_velocity_px: 250.0,
        }
    }
}

impl CarouselConfig {
    pub fn autoplay_interval(&self) -> Option<Duration> {
        (self.autoplay_ms > 0).then(|| Duration::from_millis(self.autoplay_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> i8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CarouselEvent {
    Next,
    Prev,
    GoTo(isize),
    KeyRight,
    KeyLeft,
    DragRelease { offset_x: f64, velocity_x: f64 },
    Tick,
    PointerEnter,
    PointerLeave,
    FocusIn,
    FocusOut,
}

impl CarouselEvent {
    /// Map a DOM key name to a navigation event.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" => Some(CarouselEvent::KeyRight),
            "ArrowLeft" => Some(CarouselEvent::KeyLeft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
    pub direction: Direction,
}

#[derive(Debug, Clone)]
pub struct Carousel {
    len: usize,
    index: usize,
    direction: Direction,
    config: CarouselConfig,
    hovered: bool,
    focused: bool,
    deadline: Option<Instant>,
}

impl Carousel {
    pub fn new(len: usize, config: CarouselConfig, now: Instant) -> Self {
        let mut carousel = Self {
            len,
            index: 0,
            direction: Direction::Forward,
            config,
            hovered: false,
            focused: false,
            deadline: None,
        };
        carousel.restart_timer(now);
        carousel
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_paused(&self) -> bool {
        self.hovered || self.focused
    }

    /// When the next autoplay advance is due, if one is scheduled.
    pub fn next_autoplay_at(&self) -> Option<Instant> {
        self.deadline
    }

    /// Slides were regenerated. Keeps the index when it is still valid.
    pub fn set_len(&mut self, len: usize, now: Instant) {
        self.len = len;
        if self.index >= len {
            self.index = 0;
        }
        self.restart_timer(now);
    }

    pub fn handle(&mut self, event: CarouselEvent, now: Instant) -> Option<Transition> {
        match event {
            CarouselEvent::Next | CarouselEvent::KeyRight => self.step(Direction::Forward, now),
            CarouselEvent::Prev | CarouselEvent::KeyLeft => self.step(Direction::Backward, now),
            CarouselEvent::GoTo(target) => self.go_to(target, now),
            CarouselEvent::DragRelease {
                offset_x,
                velocity_x,
            } => {
                let offset = self.config.drag_offset_px;
                let velocity = self.config.drag_velocity_px;
                if offset_x < -offset || velocity_x < -velocity {
                    self.step(Direction::Forward, now)
                } else if offset_x > offset || velocity_x > velocity {
                    self.step(Direction::Backward, now)
                } else {
                    debug!(offset_x, velocity_x, "Drag below threshold; snapping back");
                    None
                }
            }
            CarouselEvent::Tick => match self.deadline {
                Some(due) if now >= due && !self.is_paused() => self.step(Direction::Forward, now),
                _ => None,
            },
            CarouselEvent::PointerEnter => {
                self.hovered = true;
                self.restart_timer(now);
                None
            }
            CarouselEvent::PointerLeave => {
                self.hovered = false;
                self.restart_timer(now);
                None
            }
            CarouselEvent::FocusIn => {
                self.focused = true;
                self.restart_timer(now);
                None
            }
            CarouselEvent::FocusOut => {
                self.focused = false;
                self.restart_timer(now);
                None
            }
        }
    }

    fn step(&mut self, direction: Direction, now: Instant) -> Option<Transition> {
        if self.len < 2 {
            return None;
        }
        let to = match direction {
            Direction::Forward => (self.index + 1) % self.len,
            Direction::Backward => (self.index + self.len - 1) % self.len,
        };
        Some(self.move_to(to, direction, now))
    }

    fn go_to(&mut self, target: isize, now: Instant) -> Option<Transition> {
        if self.len == 0 {
            return None;
        }
        let to = target.rem_euclid(self.len as isize) as usize;
        if to == self.index {
            return None;
        }
        let direction = if to > self.index {
            Direction::Forward
        } else {
            Direction::Backward
        };
        Some(self.move_to(to, direction, now))
    }

    fn move_to(&mut self, to: usize, direction: Direction, now: Instant) -> Transition {
        let from = self.index;
        self.index = to;
        self.direction = direction;
        // Any index change restarts the autoplay interval.
        self.restart_timer(now);
        Transition {
            from,
            to,
            direction,
        }
    }

    fn restart_timer(&mut self, now: Instant) {
        self.deadline = match self.config.autoplay_interval() {
            Some(interval) if self.len > 1 && !self.is_paused() => Some(now + interval),
            _ => None,
        };
    }
}
