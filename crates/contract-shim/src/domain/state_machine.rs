//! # Lifecycle State Machine
//!
//! Two plain transition tables. The engine loop is the only caller and the
//! only writer of [`EngineState`].
//!
//! ## Inbound (`transition`)
//!
//! | From | Kind | To | Action |
//! |------|------|----|--------|
//! | Created | REGISTERED | Established | - |
//! | Established | READY | Ready | - |
//! | Established | RESPONSE, ERROR | Established | deliver (only while a request is outstanding) |
//! | Ready | INIT | Ready | dispatch init |
//! | Ready | TRANSACTION | Ready | dispatch transaction |
//! | Ready | RESPONSE, ERROR | Ready | deliver |
//!
//! Everything else is illegal. `KEEPALIVE` never reaches the table.
//!
//! ## Local outcomes (`local_transition`)
//!
//! | From | Kind | To |
//! |------|------|----|
//! | Established | COMPLETED | Ready |
//! | Established | ERROR | Established |
//! | Ready | COMPLETED, ERROR | Ready |
//!
//! COMPLETED only ever comes from the invocation pipeline; a peer that
//! sends one hits the illegal branch of the inbound table.

use shared_types::{Message, MessageKind};
use std::fmt;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    /// Stream open, registration not yet acknowledged.
    #[default]
    Created,
    /// Registered with the peer.
    Established,
    /// Serving invocations.
    Ready,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Established => "established",
            Self::Ready => "ready",
        })
    }
}

/// Which contract entry point an invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// `Contract::init`.
    Init,
    /// `Contract::invoke`.
    Transaction,
}

impl Invocation {
    /// Map an inbound kind to an invocation, if it is one.
    #[must_use]
    pub fn from_kind(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::Init => Some(Self::Init),
            MessageKind::Transaction => Some(Self::Transaction),
            _ => None,
        }
    }
}

/// Side effect attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing beyond the state change.
    None,
    /// Run the invocation pipeline on a separate task.
    Dispatch(Invocation),
    /// Hand the message to the response router.
    Deliver,
}

/// Result of a legal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State after the event.
    pub next: EngineState,
    /// What the engine must do.
    pub action: Action,
}

impl Transition {
    const fn to(next: EngineState, action: Action) -> Self {
        Self { next, action }
    }
}

/// Look up the transition for an inbound `kind` in `state`.
///
/// `awaiting_response` reports whether any request is outstanding; RESPONSE
/// and ERROR are only legal in `Established` when it is set.
///
/// Returns `None` for an illegal event.
#[must_use]
pub fn transition(state: EngineState, kind: MessageKind, awaiting_response: bool) -> Option<Transition> {
    use EngineState::{Created, Established, Ready};
    use MessageKind as K;

    match (state, kind) {
        (Created, K::Registered) => Some(Transition::to(Established, Action::None)),

        (Established, K::Ready) => Some(Transition::to(Ready, Action::None)),
        (Established, K::Response | K::Error) if awaiting_response => {
            Some(Transition::to(Established, Action::Deliver))
        }

        (Ready, K::Init) => Some(Transition::to(Ready, Action::Dispatch(Invocation::Init))),
        (Ready, K::Transaction) => {
            Some(Transition::to(Ready, Action::Dispatch(Invocation::Transaction)))
        }
        (Ready, K::Response | K::Error) => Some(Transition::to(Ready, Action::Deliver)),

        _ => None,
    }
}

/// State after applying a pipeline outcome of `kind` in `state`.
///
/// Returns `None` when the outcome does not apply.
#[must_use]
pub fn local_transition(state: EngineState, kind: MessageKind) -> Option<EngineState> {
    use EngineState::{Established, Ready};
    use MessageKind as K;

    match (state, kind) {
        (Established | Ready, K::Completed) => Some(Ready),
        (Established | Ready, K::Error) => Some(state),
        _ => None,
    }
}

/// Text of the ERROR sent back for an illegal event.
#[must_use]
pub fn illegal_transition_text(state: EngineState, msg: &Message) -> String {
    format!(
        "[{}]cannot handle message ({}) with payload size ({}) while in state: {}",
        msg.short_tx_id(),
        msg.kind,
        msg.payload.len(),
        state
    )
}

/// A message produced by the invocation pipeline, waiting for the engine
/// loop to apply its transition and send it.
#[derive(Debug, Clone)]
pub struct PendingTransition {
    /// The COMPLETED or ERROR outcome.
    pub msg: Message,
}
