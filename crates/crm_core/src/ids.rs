//! Entity identity factories.
//!
//! Services never call `Uuid::new_v4` directly; they ask an [`IdGenerator`]
//! so tests and imports can substitute deterministic ids.

use std::cell::Cell;
use uuid::Uuid;

pub trait IdGenerator {
    /// Returns a fresh id that was never handed out before.
    fn next_id(&self) -> Uuid;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Monotonic ids `…0001`, `…0002`, … for reproducible fixtures.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: Cell<u128>,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Uuid {
        let value = self.next.get() + 1;
        self.next.set(value);
        Uuid::from_u128(value)
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for &G {
    fn next_id(&self) -> Uuid {
        (**self).next_id()
    }
}
