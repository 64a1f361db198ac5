// SYNOID Fallback Ladder
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Ordered alternatives tried until one succeeds. Rungs are built lazily so
// a later rung never starts work before the earlier one has failed.

use std::future::Future;
use std::pin::Pin;
use tracing::{info, warn};

use crate::error::{ForgeError, ForgeResult};

type Attempt<'a, T> =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ForgeResult<T>> + Send + 'a>> + Send + 'a>;

pub struct FallbackLadder<'a, T> {
    name: &'static str,
    rungs: Vec<(&'static str, Attempt<'a, T>)>,
}

impl<'a, T: Send + 'a> FallbackLadder<'a, T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, rungs: Vec::new() }
    }

    pub fn rung<F, Fut>(mut self, label: &'static str, attempt: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = ForgeResult<T>> + Send + 'a,
    {
        self.rungs.push((label, Box::new(move || Box::pin(attempt()))));
        self
    }

    /// Add a rung only when `enabled`.
    pub fn rung_if<F, Fut>(self, enabled: bool, label: &'static str, attempt: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = ForgeResult<T>> + Send + 'a,
    {
        if enabled {
            self.rung(label, attempt)
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    /// Returns the first success, or the last rung's error unchanged.
    pub async fn climb(self) -> ForgeResult<T> {
        let total = self.rungs.len();
        let mut last_err = None;

        for (i, (label, attempt)) in self.rungs.into_iter().enumerate() {
            match attempt().await {
                Ok(value) => {
                    if i > 0 {
                        info!("[LADDER] {} succeeded on fallback '{}'", self.name, label);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if i + 1 < total {
                        warn!("[LADDER] {} step '{}' failed: {}. Trying next.", self.name, label, e);
                    } else {
                        warn!("[LADDER] {} exhausted at '{}': {}", self.name, label, e);
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ForgeError::config(format!("{} has no strategies", self.name))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn first_success_short_circuits() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = FallbackLadder::new("test")
            .rung("primary", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .rung("secondary", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .climb()
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_through_to_next() {
        let result = FallbackLadder::new("test")
            .rung("primary", || async { Err(ForgeError::engine("ffmpeg", Some(1), "boom")) })
            .rung("secondary", || async { Ok("native") })
            .climb()
            .await;
        assert_eq!(result.unwrap(), "native");
    }

    #[tokio::test]
    async fn exhausted_returns_last_error() {
        let result: ForgeResult<()> = FallbackLadder::new("test")
            .rung("a", || async { Err(ForgeError::engine("a", Some(1), "first")) })
            .rung("b", || async { Err(ForgeError::engine("b", Some(2), "second")) })
            .climb()
            .await;
        match result {
            Err(ForgeError::EngineExecution { engine, detail, .. }) => {
                assert_eq!(engine, "b");
                assert_eq!(detail, "second");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn disabled_rung_is_skipped() {
        let ladder: FallbackLadder<'_, u8> = FallbackLadder::new("test")
            .rung("a", || async { Ok(1) })
            .rung_if(false, "b", || async { Ok(2) });
        assert_eq!(ladder.len(), 1);
    }

    #[tokio::test]
    async fn empty_ladder_is_configuration_error() {
        let result: ForgeResult<()> = FallbackLadder::new("empty").climb().await;
        assert!(matches!(result, Err(ForgeError::Configuration(_))));
    }
}
