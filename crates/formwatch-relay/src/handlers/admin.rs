//! Admin snapshot requests

use super::{parse_payload, ClientRequest, HandlerResult};
use crate::protocol::{Envelope, EventName, UserRefPayload};
use formwatch_core::{Identity, Role};

/// Handles `admin:*` requests
pub struct AdminHandler;

impl AdminHandler {
    /// `admin:requestUserFormState`
    pub fn handle_user_form_state(
        identity: &Identity,
        envelope: &Envelope,
    ) -> HandlerResult<ClientRequest> {
        let event = EventName::RequestUserFormState;
        identity.ensure_role(Role::Admin, event.as_str())?;

        let payload: UserRefPayload = parse_payload(event, envelope)?;
        Ok(ClientRequest::UserFormState {
            user_id: payload.user_id,
        })
    }

    /// `admin:requestAllUserStatus`
    pub fn handle_all_user_status(identity: &Identity) -> HandlerResult<ClientRequest> {
        identity.ensure_role(Role::Admin, EventName::RequestAllUserStatus.as_str())?;
        Ok(ClientRequest::AllUserStatus)
    }
}
