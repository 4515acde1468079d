//! News dialog lifecycle.
//!
//! Opening a dialog acquires three things from the host page: the document
//! scroll lock, keyboard focus on the close control and an `Escape` key
//! listener. Every exit path (close button, `Escape`, backdrop click, or
//! dropping the [`Dialog`]) releases all of them exactly once, and the
//! scroll value restored is whatever the page had before, not a hard-coded
//! `visible`.

use crate::error::FetchError;
use crate::models::ModalPayload;
use crate::slides::fallback_payload;
use tracing::debug;

/// Overflow value written while a dialog holds the scroll lock.
pub const SCROLL_LOCKED: &str = "hidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(pub u64);

/// Page-side effects the dialog needs. Implemented by whatever renders it.
pub trait DialogHost {
    fn scroll_overflow(&self) -> String;
    fn set_scroll_overflow(&mut self, value: &str);
    fn focus_close_control(&mut self);
    fn add_escape_listener(&mut self) -> ListenerId;
    fn remove_listener(&mut self, id: ListenerId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Button,
    Escape,
    Backdrop,
    Unmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Backdrop,
    Panel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState {
    Closed,
    Open(ModalPayload),
}

/// Resources held while open.
#[derive(Debug)]
struct Session {
    previous_overflow: String,
    listener: ListenerId,
}

pub struct Dialog<H: DialogHost> {
    host: H,
    state: DialogState,
    session: Option<Session>,
}

impl<H: DialogHost> Dialog<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: DialogState::Closed,
            session: None,
        }
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open(_))
    }

    pub fn payload(&self) -> Option<&ModalPayload> {
        match &self.state {
            DialogState::Open(payload) => Some(payload),
            DialogState::Closed => None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Show `payload`. Opening an already open dialog swaps its content
    /// without acquiring anything twice.
    pub fn open(&mut self, payload: ModalPayload) {
        if self.session.is_none() {
            let previous_overflow = self.host.scroll_overflow();
            self.host.set_scroll_overflow(SCROLL_LOCKED);
            let listener = self.host.add_escape_listener();
            self.session = Some(Session {
                previous_overflow,
                listener,
            });
            debug!(title = %payload.title, "Dialog opened");
        }
        self.state = DialogState::Open(payload);
        self.host.focus_close_control();
    }

    /// Open with the detail result, or with fallback content when it failed.
    pub fn open_result(&mut self, result: Result<ModalPayload, FetchError>) {
        match result {
            Ok(payload) => self.open(payload),
            Err(err) => {
                debug!(error = %err, "Opening dialog with fallback content");
                self.open(fallback_payload(&err));
            }
        }
    }

    /// Returns `true` when this call closed the dialog.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if !self.is_open() {
            return false;
        }
        self.release();
        self.state = DialogState::Closed;
        debug!(?reason, "Dialog closed");
        true
    }

    pub fn on_key(&mut self, key: &str) -> bool {
        key == "Escape" && self.close(CloseReason::Escape)
    }

    /// Only clicks on the backdrop close; clicks inside the panel do not.
    pub fn on_click(&mut self, target: ClickTarget) -> bool {
        match target {
            ClickTarget::Backdrop => self.close(CloseReason::Backdrop),
            ClickTarget::Panel => false,
        }
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.host.remove_listener(session.listener);
            self.host.set_scroll_overflow(&session.previous_overflow);
        }
    }
}

impl<H: DialogHost> Drop for Dialog<H> {
    fn drop(&mut self) {
        if self.session.is_some() {
            debug!(reason = ?CloseReason::Unmount, "Dialog released");
        }
        self.release();
    }
}
