//! # Authentication Module
//!
//! Anti-forgery `state` values for the Microsoft sign-in flow. `/calendar`
//! issues a value and `/callback` only accepts a code that returns one it
//! has issued. Values are single use and expire after [`STATE_TTL`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use rand::{Rng, distributions::Alphanumeric, thread_rng};
use tracing::debug;

/// How long a sign-in may take before its state value is rejected.
pub const STATE_TTL: Duration = Duration::from_secs(10 * 60);

const STATE_LENGTH: usize = 32;

/// Pending sign-in states, shared between handlers.
#[derive(Debug, Clone, Default)]
pub struct OAuthStates {
    issued: Arc<RwLock<HashMap<String, Instant>>>,
}

impl OAuthStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates and remembers a new random state value.
    pub fn issue(&self) -> String {
        let state: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LENGTH)
            .map(char::from)
            .collect();

        let now = Instant::now();
        let mut issued = self.issued.write().unwrap_or_else(PoisonError::into_inner);
        issued.retain(|_, at| now.duration_since(*at) < STATE_TTL);
        issued.insert(state.clone(), now);
        debug!("Issued sign-in state, {} pending", issued.len());
        state
    }

    /// Removes `state` and reports whether it was issued and is still fresh.
    pub fn consume(&self, state: &str) -> bool {
        let mut issued = self.issued.write().unwrap_or_else(PoisonError::into_inner);
        match issued.remove(state) {
            Some(at) => at.elapsed() < STATE_TTL,
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.issued
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
