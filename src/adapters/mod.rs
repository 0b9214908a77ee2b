//! Adapters exposing the gateway to clients.

pub mod tcp;
