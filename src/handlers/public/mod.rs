// handlers/public/mod.rs - Handlers reachable without a token
//
// Route prefix: /api (health, login, register, catalog reads)

pub mod auth;
pub mod health;
pub mod properties;
