//! Periodic driver of the bot pools.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use super::bot::UserBot;
use super::ids::SyntheticIds;
use super::penitent_bot::PenitentBot;
use super::pool::BotPool;
use super::priest_bot::PriestBot;
use crate::api::Session;
use crate::config::SyncSettings;
use crate::model::{DecodeMode, Notification};

/// Delay before the first tick after start.
pub const FIRST_TICK_DELAY: Duration = Duration::from_millis(250);

/// Half-width of the window tick delays are drawn from.
const SPAWN_JITTER_SECS: f64 = 3.0;
const MIN_SPAWN_DELAY_SECS: f64 = 0.1;

/// Owns the priest and penitent bot pools and the ids they allocate.
pub struct BotSpawner {
    priests: Option<BotPool>,
    penitents: Option<BotPool>,
    ids: SyntheticIds,
    mean_rate_secs: f64,
}

impl BotSpawner {
    /// Builds the pools enabled by the settings.
    ///
    /// Priest bots talk to the current user whatever their role; penitent
    /// bots only exist when the current user is a priest.
    pub fn new(settings: &SyncSettings, session: &Session) -> Self {
        let user_id = session.user_id();
        let priests = settings.priest_bots_enabled.then(|| {
            BotPool::new(
                "priest",
                settings.max_bot_count,
                Box::new(move |_: u64, ids: &mut SyntheticIds| -> Box<dyn UserBot> {
                    Box::new(PriestBot::new(user_id, ids))
                }),
            )
        });
        let penitents = (settings.penitent_bots_enabled && session.is_priest()).then(|| {
            BotPool::new(
                "penitent",
                settings.max_bot_count,
                Box::new(move |_: u64, ids: &mut SyntheticIds| -> Box<dyn UserBot> {
                    Box::new(PenitentBot::new(user_id, ids))
                }),
            )
        });
        Self {
            priests,
            penitents,
            ids: SyntheticIds::new(settings.synthetic_id_base),
            mean_rate_secs: settings.fake_spawn_mean_rate_secs,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.priests.is_some() || self.penitents.is_some()
    }

    /// Number of bots currently in a conversation.
    pub fn bot_count(&self) -> usize {
        self.pools().map(BotPool::active_count).sum()
    }

    fn pools(&self) -> impl Iterator<Item = &BotPool> {
        self.priests.iter().chain(self.penitents.iter())
    }

    /// Delay until the next tick, uniform around the configured mean.
    pub fn next_delay(&self, rng: &mut StdRng) -> Duration {
        let low = (self.mean_rate_secs - SPAWN_JITTER_SECS).max(MIN_SPAWN_DELAY_SECS);
        let high = (self.mean_rate_secs + SPAWN_JITTER_SECS).max(low);
        Duration::from_secs_f64(rng.random_range(low..=high))
    }

    /// Advances each pool by one step.
    pub fn tick(&mut self, rng: &mut StdRng, mode: DecodeMode) -> Vec<Notification> {
        let mut generated = Vec::new();
        for pool in [self.priests.as_mut(), self.penitents.as_mut()]
            .into_iter()
            .flatten()
        {
            if let Some(notification) = pool.next_notification(&mut self.ids, rng, mode) {
                generated.push(notification);
            }
        }
        debug!(
            "Generating fake notifications... OK ({} new, {} bots, {} created)",
            generated.len(),
            self.bot_count(),
            self.pools().map(BotPool::created_count).sum::<u64>()
        );
        generated
    }
}
