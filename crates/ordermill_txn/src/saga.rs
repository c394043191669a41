//! Compensating-action log for multi-step write sequences.
//!
//! The store has no multi-row atomicity, so an aborting transaction must
//! undo its own writes. Each completed write pushes its inverse here; on
//! failure the log unwinds in reverse order.

use crate::error::StoreError;
use crate::store::{Session, Table};

/// Inverse of one applied write.
#[derive(Debug)]
pub(crate) enum Compensation {
    /// Remove a row this transaction inserted.
    Delete { table: Table, key: Vec<u8> },
    /// Restore the row image that existed before this transaction's update.
    Restore {
        table: Table,
        key: Vec<u8>,
        prior: Vec<u8>,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Saga {
    steps: Vec<Compensation>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    /// Apply the compensations in reverse order. On the first failure the
    /// unwind stops and reports how many compensations (including the
    /// failed one) were left unapplied.
    pub async fn unwind(self, session: &Session) -> Result<(), (usize, StoreError)> {
        let mut remaining = self.steps.len();
        for step in self.steps.into_iter().rev() {
            let res = match step {
                Compensation::Delete { table, key } => session.delete(table, &key).await,
                Compensation::Restore { table, key, prior } => {
                    session.put_raw(table, key, prior).await
                }
            };
            if let Err(err) = res {
                return Err((remaining, err));
            }
            remaining -= 1;
        }
        Ok(())
    }
}
