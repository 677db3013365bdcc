//! Relay protocol definitions
//!
//! Defines the WebSocket protocol including event names, the message envelope, payloads, and close codes.

mod close_codes;
mod event_names;
mod messages;
mod payloads;

pub use close_codes::CloseCode;
pub use event_names::EventName;
pub use messages::Envelope;
pub use payloads::{
    AllUserStatusEvent, FieldActivity, FormRef, FormSavedEvent, FormSavedPayload, LoginEvent,
    StatusEvent, StatusUpdatePayload, TypingEndEvent, TypingEndPayload, TypingEvent,
    TypingPayload, UserFormStateEvent, UserRefPayload, MAX_FORM_ID_LEN,
};
