//! Value objects - immutable types that represent domain concepts

mod field_name;
mod user_id;

pub use field_name::{FieldName, MAX_FIELD_NAME_LEN, MAX_FIELD_VALUE_LEN};
pub use user_id::{UserId, UserIdParseError};
