//! Inbound event handlers
//!
//! Turn a raw client frame into a validated, authorized [`ClientRequest`]
//! for the hub. Runs on the connection's reader task, so the hub only ever
//! sees requests that already passed identity and role checks.

mod admin;
mod error;
mod status;
mod typing;

pub use admin::AdminHandler;
pub use error::{HandlerError, HandlerResult};
pub use status::StatusHandler;
pub use typing::TypingHandler;

use crate::protocol::{Envelope, EventName};
use formwatch_core::{FieldName, Identity, UserId};
use serde::de::DeserializeOwned;

/// Explicit presence signal from a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitStatus {
    Online,
    Offline,
}

/// A validated request from a connection, acting as that connection's identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// `typing:start` or `typing:update`
    Typing { field: FieldName, value: String },
    /// `typing:end`
    TypingEnd { field: FieldName },
    /// `user:status`
    SetStatus(ExplicitStatus),
    /// `form:saved`
    FormSaved { form_id: Option<String> },
    /// `admin:requestUserFormState`
    UserFormState { user_id: UserId },
    /// `admin:requestAllUserStatus`
    AllUserStatus,
}

impl ClientRequest {
    /// Short name for logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Typing { .. } => "typing",
            Self::TypingEnd { .. } => "typing_end",
            Self::SetStatus(_) => "set_status",
            Self::FormSaved { .. } => "form_saved",
            Self::UserFormState { .. } => "user_form_state",
            Self::AllUserStatus => "all_user_status",
        }
    }
}

/// Dispatch incoming client frames to the handler for their event
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Decode, validate and authorize one text frame
    pub fn dispatch(identity: &Identity, text: &str) -> HandlerResult<ClientRequest> {
        let envelope = Envelope::from_json(text).map_err(HandlerError::Decode)?;

        let event = envelope
            .name()
            .ok_or_else(|| HandlerError::UnknownEvent(envelope.event.clone()))?;

        if !event.is_client_event() {
            return Err(HandlerError::ServerOnlyEvent(event));
        }

        match event {
            EventName::TypingStart | EventName::TypingUpdate => {
                TypingHandler::handle_touch(identity, event, &envelope)
            }
            EventName::TypingEnd => TypingHandler::handle_end(identity, &envelope),
            EventName::UserStatus => StatusHandler::handle_status(identity, &envelope),
            EventName::FormSaved => StatusHandler::handle_form_saved(identity, &envelope),
            EventName::RequestUserFormState => {
                AdminHandler::handle_user_form_state(identity, &envelope)
            }
            EventName::RequestAllUserStatus => AdminHandler::handle_all_user_status(identity),
            // Rejected by is_client_event above
            EventName::UserLogin | EventName::UserFormState | EventName::AllUserStatus => {
                Err(HandlerError::ServerOnlyEvent(event))
            }
        }
    }
}

/// Decode the data of an envelope as the payload of `event`
fn parse_payload<T: DeserializeOwned>(event: EventName, envelope: &Envelope) -> HandlerResult<T> {
    envelope
        .data_as()
        .map_err(|source| HandlerError::InvalidPayload { event, source })
}
