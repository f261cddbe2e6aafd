//! Duplicate call suppression.
//!
//! [`Group::work`] runs a function for a key unless a call for the same key is
//! already in flight, in which case it blocks until that call finishes and
//! returns its result. Each "generation" of overlapping callers for a key
//! shares a single execution; once it completes the record is dropped and the
//! next caller starts a fresh one.
//!
//! The key map is guarded by one mutex, but waiters park on a per-call
//! condition variable, so slow loads never hold up unrelated keys.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use crate::error::{Error, Result};

/// An in-flight or completed call.
struct Call<T> {
    result: Mutex<Option<Result<T>>>,
    done: Condvar,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Call {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<T> {
        let mut result = self.result.lock();
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut result);
        }
    }

    fn publish(&self, result: Result<T>) {
        *self.result.lock() = Some(result);
        self.done.notify_all();
    }
}

/// Collapses concurrent calls for the same key into one execution.
///
/// # Examples
///
/// ```
/// use peercache::singleflight::Group;
///
/// let flights: Group<String> = Group::new();
/// let value = flights.work("config", || Ok("loaded".to_string())).unwrap();
/// assert_eq!(value, "loaded");
/// assert_eq!(flights.in_flight(), 0);
/// ```
pub struct Group<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T: Clone> Group<T> {
    /// Creates an empty group.
    pub fn new() -> Self {
        Group {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Executes `f` for `key`, or waits for the execution already in flight.
    ///
    /// `f` runs on the calling thread. Its result, success or error, is
    /// delivered unchanged to every caller that joined while it ran. If `f`
    /// unwinds, waiting callers receive [`Error::LoadAbandoned`].
    pub fn work<F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut calls = self.calls.lock();
        if let Some(call) = calls.get(key) {
            let call = Arc::clone(call);
            drop(calls);
            return call.wait();
        }

        let call = Arc::new(Call::new());
        calls.insert(key.to_string(), Arc::clone(&call));
        drop(calls);

        let mut flight = Flight {
            group: self,
            key,
            call,
            result: None,
        };
        let result = f();
        flight.result = Some(result.clone());
        drop(flight);
        result
    }

    /// Number of keys with a call currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T: Clone> Default for Group<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

/// Publishes the outcome of an executing call and deregisters it, also when
/// the executing caller unwinds.
struct Flight<'a, T: Clone> {
    group: &'a Group<T>,
    key: &'a str,
    call: Arc<Call<T>>,
    result: Option<Result<T>>,
}

impl<T: Clone> Drop for Flight<'_, T> {
    fn drop(&mut self) {
        let result = self.result.take().unwrap_or(Err(Error::LoadAbandoned));
        self.call.publish(result);

        let mut calls = self.group.calls.lock();
        if calls
            .get(self.key)
            .is_some_and(|call| Arc::ptr_eq(call, &self.call))
        {
            calls.remove(self.key);
        }
    }
}
