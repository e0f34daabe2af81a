//! Invalidation tokens.
//!
//! Every object owns a generation counter. A [`Token`] records the counter
//! value at the time it was issued and stays valid for as long as the
//! counter has not moved. Mutating an object bumps its counter, which
//! invalidates every token handed out before the mutation in one step.
//!
//! Not thread safe: counters are plain `Cell`s and tokens are `!Send`.

use std::{cell::Cell, fmt, rc::Rc};

use tracing::trace;

/// Owner side of a token: one per object.
#[derive(Default)]
pub(crate) struct Generation {
    counter: Rc<Cell<u64>>,
}

impl Generation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the currently live token.
    pub(crate) fn current(&self) -> Token {
        Token {
            counter: Rc::clone(&self.counter),
            issued: self.counter.get(),
        }
    }

    /// Invalidates the live token and installs a fresh one.
    pub(crate) fn advance(&self) {
        let next = self.counter.get().wrapping_add(1);
        trace!(generation = next, "invalidation token replaced");
        self.counter.set(next);
    }
}

/// "No mutation has happened since this token was issued."
#[derive(Clone)]
pub struct Token {
    counter: Rc<Cell<u64>>,
    issued: u64,
}

impl Token {
    pub fn is_valid(&self) -> bool {
        self.counter.get() == self.issued
    }

    /// Invalidates this token. No-op when it is already stale.
    pub fn invalidate(&self) {
        if self.is_valid() {
            self.counter.set(self.issued.wrapping_add(1));
        }
    }

    /// Invalidates a group of tokens.
    pub fn invalidate_all(tokens: &[Token]) {
        for token in tokens {
            token.invalidate();
        }
    }

    /// The generation this token was issued at.
    pub fn generation(&self) -> u64 {
        self.issued
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("issued", &self.issued)
            .field("valid", &self.is_valid())
            .finish()
    }
}
