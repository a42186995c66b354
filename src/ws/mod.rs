pub mod channels;
pub mod handler;
pub mod hub;
pub mod notifier;
pub mod presence;

pub use hub::{Hub, HubStats};
pub use notifier::Notifier;
