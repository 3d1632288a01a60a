//! External delivery channels for alerts.

pub mod webhook;
