//! User status and form lifecycle handlers (`user:status`, `form:saved`)

use super::{parse_payload, ClientRequest, ExplicitStatus, HandlerResult};
use crate::protocol::{Envelope, EventName, FormRef, FormSavedPayload, StatusUpdatePayload};
use formwatch_core::{DomainError, Identity, PresenceStatus, Role};
use validator::Validate;

/// Handles explicit presence signals and save notifications
pub struct StatusHandler;

impl StatusHandler {
    /// `user:status`
    pub fn handle_status(identity: &Identity, envelope: &Envelope) -> HandlerResult<ClientRequest> {
        let event = EventName::UserStatus;
        let payload: StatusUpdatePayload = parse_payload(event, envelope)?;
        payload.validate()?;

        identity.ensure_role(Role::User, event.as_str())?;
        identity.ensure_owns(payload.user_id)?;

        let status = match payload.parsed_status() {
            Some(PresenceStatus::Offline) => ExplicitStatus::Offline,
            Some(PresenceStatus::Online) => ExplicitStatus::Online,
            _ => return Err(DomainError::InvalidStatus(payload.status).into()),
        };

        Ok(ClientRequest::SetStatus(status))
    }

    /// `form:saved`
    pub fn handle_form_saved(
        identity: &Identity,
        envelope: &Envelope,
    ) -> HandlerResult<ClientRequest> {
        let event = EventName::FormSaved;
        let payload: FormSavedPayload = parse_payload(event, envelope)?;

        identity.ensure_role(Role::User, event.as_str())?;
        identity.ensure_owns(payload.user_id)?;

        let form_id = payload.form_id.map(FormRef::into_string).transpose()?;

        Ok(ClientRequest::FormSaved { form_id })
    }
}
