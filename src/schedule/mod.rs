//! Delivery collaborators of the rescheduler: the delayed retrigger queue and
//! the broadcast channel.

pub mod broadcast;
pub mod queue;

pub use broadcast::{BroadcastMessage, Broadcaster, ChannelBroadcaster};
pub use queue::{DelayedMessage, DelayedQueue, DueMessages, LocalDelayedQueue};
