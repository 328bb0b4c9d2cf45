// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Admin (admin JWT, enforced by the admin_gate layer)

pub mod admin;
pub mod public;
