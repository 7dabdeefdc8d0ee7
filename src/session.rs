//! Lifecycle of the single immersive session.
//!
//! The enter/exit button drives [`SessionManager::toggle`]. While a session is
//! being requested further presses are ignored, and while one is running a
//! press ends it. There is never more than one session.

/// Something that can end an active session.
pub trait SessionHandle {
    fn end(&self);
}

#[derive(Debug, Default)]
pub enum SessionState<S> {
    #[default]
    Idle,
    Requesting,
    Active(S),
}

/// What the caller has to do after a button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Ask the platform for a new session and report back via `started` / `start_failed`.
    Request,
    /// A request is already in flight.
    Ignored,
    /// The active session was asked to end; `ended` follows from its end event.
    Ended,
}

#[derive(Debug, Default)]
pub struct SessionManager<S> {
    state: SessionState<S>,
}

impl<S: SessionHandle> SessionManager<S> {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn toggle(&mut self) -> SessionAction {
        match &self.state {
            SessionState::Idle => {
                self.state = SessionState::Requesting;
                SessionAction::Request
            }
            SessionState::Requesting => {
                log::debug!("session request already in flight");
                SessionAction::Ignored
            }
            SessionState::Active(session) => {
                session.end();
                SessionAction::Ended
            }
        }
    }

    pub fn started(&mut self, session: S) {
        if let SessionState::Active(previous) = &self.state {
            log::warn!("a second session started, ending the previous one");
            previous.end();
        }
        self.state = SessionState::Active(session);
        log::info!("session started");
    }

    pub fn start_failed(&mut self) {
        if matches!(self.state, SessionState::Requesting) {
            self.state = SessionState::Idle;
        }
    }

    /// The session ended, by request or because the device closed it.
    pub fn ended(&mut self) {
        self.state = SessionState::Idle;
        log::info!("session ended");
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    pub fn state(&self) -> &SessionState<S> {
        &self.state
    }

    pub fn active(&self) -> Option<&S> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }
}
