// handlers/public/auth/mod.rs - Token acquisition and account creation

pub mod login;
pub mod register;

pub use login::login_post;
pub use register::register_post;
