// handlers/admin/mod.rs - Back-office handlers
//
// Route prefix: /api/admin
// Middleware: admin_gate (401 without a valid token, 403 for non-admin roles).
// Handlers can rely on a `Principal` in the request extensions.

pub mod properties;
pub mod stats;
