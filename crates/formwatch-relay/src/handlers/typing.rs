//! Typing event handlers (`typing:start`, `typing:update`, `typing:end`)

use super::{parse_payload, ClientRequest, HandlerResult};
use crate::protocol::{Envelope, EventName, TypingEndPayload, TypingPayload};
use formwatch_core::{FieldName, Identity, Role};
use validator::Validate;

/// Handles typing notifications from end users
pub struct TypingHandler;

impl TypingHandler {
    /// `typing:start` and `typing:update` share one upsert path in the hub
    pub fn handle_touch(
        identity: &Identity,
        event: EventName,
        envelope: &Envelope,
    ) -> HandlerResult<ClientRequest> {
        let payload: TypingPayload = parse_payload(event, envelope)?;
        payload.validate()?;

        identity.ensure_role(Role::User, event.as_str())?;
        identity.ensure_owns(payload.user_id)?;

        let field = FieldName::parse(payload.field)?;

        Ok(ClientRequest::Typing {
            field,
            value: payload.value,
        })
    }

    /// `typing:end`
    pub fn handle_end(identity: &Identity, envelope: &Envelope) -> HandlerResult<ClientRequest> {
        let event = EventName::TypingEnd;
        let payload: TypingEndPayload = parse_payload(event, envelope)?;
        payload.validate()?;

        identity.ensure_role(Role::User, event.as_str())?;
        identity.ensure_owns(payload.user_id)?;

        let field = FieldName::parse(payload.field)?;

        Ok(ClientRequest::TypingEnd { field })
    }
}
