//! A dynamically growing set of bots of one kind.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

use super::bot::UserBot;
use super::ids::SyntheticIds;
use crate::model::{DecodeMode, Notification};

/// Builds the `index`-th bot of a pool.
pub type BotFactory = Box<dyn FnMut(u64, &mut SyntheticIds) -> Box<dyn UserBot> + Send>;

pub struct BotPool {
    label: &'static str,
    max_bots: Option<u64>,
    created: u64,
    active: Vec<Box<dyn UserBot>>,
    factory: BotFactory,
}

impl BotPool {
    /// Creates an empty pool. `max_bots == None` lets it grow forever.
    pub fn new(label: &'static str, max_bots: Option<u64>, factory: BotFactory) -> Self {
        Self {
            label,
            max_bots,
            created: 0,
            active: Vec::new(),
            factory,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn created_count(&self) -> u64 {
        self.created
    }

    fn can_create(&self) -> bool {
        self.max_bots.map_or(true, |max| self.created < max)
    }

    /// True once every bot the pool may ever create has finished.
    pub fn is_exhausted(&self) -> bool {
        self.active.is_empty() && !self.can_create()
    }

    /// Advances one bot, chosen uniformly among the active ones plus a slot
    /// that spawns a new bot. Finished bots are dropped along the way.
    pub fn next_notification(
        &mut self,
        ids: &mut SyntheticIds,
        rng: &mut StdRng,
        mode: DecodeMode,
    ) -> Option<Notification> {
        while !self.is_exhausted() {
            let selected = rng.random_range(0..=self.active.len());
            if selected == self.active.len() {
                if !self.can_create() {
                    continue;
                }
                let mut bot = (self.factory)(self.created, ids);
                self.created += 1;
                match bot.next_notification(ids, rng, mode) {
                    Some(first) => {
                        self.active.push(bot);
                        return Some(first);
                    }
                    None => {
                        warn!("New {} bot produced no notification", self.label);
                        continue;
                    }
                }
            }
            if let Some(notification) = self.active[selected].next_notification(ids, rng, mode) {
                return Some(notification);
            }
            self.active.remove(selected);
        }
        None
    }
}
