//! Synthetic event generator.
//!
//! Bots impersonate priests and penitents and produce the notifications a
//! real counterpart would cause, without any server round trip. Their output
//! is merged through the same path as fetched notifications.

mod bot;
mod ids;
mod penitent_bot;
mod pool;
mod priest_bot;
mod spawner;

pub use bot::UserBot;
pub use ids::SyntheticIds;
pub use penitent_bot::PenitentBot;
pub use pool::{BotFactory, BotPool};
pub use priest_bot::{PriestBot, MAX_CHAT_MESSAGES};
pub use spawner::{BotSpawner, FIRST_TICK_DELAY};
