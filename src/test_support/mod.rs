//! Helpers shared by in-crate tests that need a localhost socket.

#[path = "../../tests/support/socket_guard.rs"]
pub mod socket_guard;
