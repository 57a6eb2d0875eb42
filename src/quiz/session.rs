use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::quiz::Question;

/// Generated variants keyed by source question index. Entries are never
/// evicted; the bank size bounds the map.
#[derive(Debug)]
pub struct SessionStore {
    total: usize,
    generated: Mutex<HashMap<usize, Question>>,
}

impl SessionStore {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            generated: Mutex::new(HashMap::with_capacity(total)),
        }
    }

    // A panic elsewhere cannot leave a half-written entry, so keep going.
    fn lock(&self) -> MutexGuard<'_, HashMap<usize, Question>> {
        self.generated.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, index: usize) -> Option<Question> {
        self.lock().get(&index).cloned()
    }

    /// Last write wins when two requests raced on the same index.
    pub fn put(&self, index: usize, question: Question) {
        self.lock().insert(index, question);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Share of the bank generated so far, rounded to two decimals.
    pub fn completion_ratio(&self) -> f64 {
        round2(self.raw_ratio())
    }

    /// The same share as a percentage, rounded to two decimals.
    pub fn generation_percentage(&self) -> f64 {
        round2(self.raw_ratio() * 100.0)
    }

    fn raw_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.len() as f64 / self.total as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
