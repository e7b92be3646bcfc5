//! Credential models shared by the token store, the request pipeline, and the refresh
//! coordinator.

pub mod pair;
pub mod secret;

pub use pair::*;
pub use secret::*;
