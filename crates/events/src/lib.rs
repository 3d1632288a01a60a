//! Alert transport for the excavation monitor.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`AlertEvent`]: the envelope for created violations and predictive
//!   warnings.
//! - [`AlertDispatcher`]: background service that fans every alert out to
//!   the matching webhook subscriptions.
//! - [`delivery`]: the webhook channel itself.

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{AlertEvent, EventBus};
pub use delivery::webhook::WebhookDelivery;
pub use dispatcher::AlertDispatcher;
