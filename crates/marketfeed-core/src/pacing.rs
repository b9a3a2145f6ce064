//! Blocking pauses between paged and chunked upstream requests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Suspends the current operation for a fixed interval.
pub trait Cooldown: Send + Sync {
    fn pause<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCooldown;

impl Cooldown for TokioCooldown {
    fn pause<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
        })
    }
}

/// Records requested pauses without sleeping.
#[derive(Debug, Default)]
pub struct RecordingCooldown {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingCooldown {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<Duration>> {
        self.pauses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.log().clone()
    }

    pub fn count(&self) -> usize {
        self.log().len()
    }
}

impl Cooldown for RecordingCooldown {
    fn pause<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        self.log().push(duration);
        Box::pin(async {})
    }
}
