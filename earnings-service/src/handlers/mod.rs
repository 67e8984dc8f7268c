pub mod auth;
pub mod clients;
pub mod companies;
pub mod earnings;
pub mod health;
pub mod invitations;
pub mod metrics;
pub mod services;
pub mod stats;
pub mod transactions;
