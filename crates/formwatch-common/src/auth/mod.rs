//! Identity token validation

mod jwt;
mod provider;

pub use jwt::{Claims, JwtService};
pub use provider::IdentityProvider;
