//! HTTP handlers

pub mod auth;
pub mod calls;
pub mod directory;
pub mod health;
pub mod shared;
pub mod webhook;

pub use auth::*;
pub use calls::*;
pub use directory::*;
pub use health::*;
pub use webhook::*;
