pub mod auth;
pub mod tenant;

pub use auth::{auth_middleware, AuthUser};
pub use tenant::{tenant_middleware, TenantContext};
