use std::time::{Duration, Instant};

pub mod chat;
pub mod documents;
pub mod navbar;
pub mod workspace;

pub const BANNER_TTL: Duration = Duration::from_secs(5);
pub const COPY_FLASH_TTL: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Workspace,
    Documents,
}

#[derive(Debug, Clone)]
pub struct Flash<T> {
    slot: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T> Flash<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { slot: None, ttl }
    }

    pub fn show(&mut self, value: T) {
        self.show_at(value, Instant::now());
    }

    pub fn show_at(&mut self, value: T, now: Instant) {
        self.slot = Some((value, now + self.ttl));
    }

    pub fn get(&self) -> Option<&T> {
        self.slot.as_ref().map(|(value, _)| value)
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        let deadline = self.slot.as_ref().map(|(_, deadline)| *deadline)?;
        if now >= deadline {
            self.slot = None;
            None
        } else {
            Some(deadline - now)
        }
    }
}
