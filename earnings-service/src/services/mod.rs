//! Services layer for earnings-service: persistence, token issuing and
//! service metrics.

mod database;
mod jwt;
pub mod metrics;

pub use database::{ActiveMembership, ClientFields, Database};
pub use jwt::{AccessTokenClaims, JwtService};
