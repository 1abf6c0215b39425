use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::backend::backend::{AccessibilityBackend, ElementHandle};
use crate::tree::tree_model::{Attribute, AttributeValue};

pub const DEFAULT_SETTLE_MS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    #[default]
    Fixed,
    Poll,
}

/// How long to let the target application redraw after a mutating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    None,
    Fixed(Duration),
    /// Re-read the element until two reads agree, or fall back to `fallback`
    /// once `timeout` passes.
    Poll {
        interval: Duration,
        timeout: Duration,
        fallback: Duration,
    },
}

impl Default for Settle {
    fn default() -> Self {
        Settle::Fixed(Duration::from_millis(DEFAULT_SETTLE_MS))
    }
}

impl Settle {
    pub fn from_config(mode: SettleMode, settle_ms: u64, interval_ms: u64, timeout_ms: u64) -> Self {
        match mode {
            SettleMode::Fixed if settle_ms == 0 => Settle::None,
            SettleMode::Fixed => Settle::Fixed(Duration::from_millis(settle_ms)),
            SettleMode::Poll => Settle::Poll {
                interval: Duration::from_millis(interval_ms.max(1)),
                timeout: Duration::from_millis(timeout_ms),
                fallback: Duration::from_millis(settle_ms),
            },
        }
    }

    /// Wait for the UI after an action on `element` (or on the container
    /// when there is no element, which always uses the fixed delay).
    pub fn wait(&self, backend: &mut dyn AccessibilityBackend, element: Option<&ElementHandle>) {
        match (*self, element) {
            (Settle::None, _) => {}
            (Settle::Fixed(delay), _) => sleep(delay),
            (Settle::Poll { fallback, .. }, None) => sleep(fallback),
            (
                Settle::Poll {
                    interval,
                    timeout,
                    fallback,
                },
                Some(handle),
            ) => {
                if !poll_until_stable(backend, handle, interval, timeout) {
                    trace!(%handle, "element did not settle, using fixed delay");
                    sleep(fallback);
                }
            }
        }
    }
}

type Observed = (Option<String>, Option<bool>);

fn observe(backend: &mut dyn AccessibilityBackend, handle: &ElementHandle) -> Option<Observed> {
    let value = backend.read_attribute(handle, Attribute::Value).ok()?;
    let enabled = backend.read_attribute(handle, Attribute::Enabled).ok()?;
    let value = match value {
        Some(AttributeValue::Text(s)) => Some(s),
        _ => None,
    };
    let enabled = match enabled {
        Some(AttributeValue::Bool(b)) => Some(b),
        _ => None,
    };
    Some((value, enabled))
}

fn poll_until_stable(
    backend: &mut dyn AccessibilityBackend,
    handle: &ElementHandle,
    interval: Duration,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    let mut previous = observe(backend, handle);

    while Instant::now() < deadline {
        sleep(interval);
        let current = observe(backend, handle);
        if current.is_some() && current == previous {
            return true;
        }
        previous = current;
    }
    false
}

fn sleep(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
