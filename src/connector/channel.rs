// src/connector/channel.rs

use std::future::Future;

use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Lazily created, cached channel with single-flight creation.
///
/// The creator holds the write guard for the whole creation, so callers racing on an
/// empty slot queue behind it and pick up its result instead of opening a second
/// channel. A failed creation leaves the slot empty; the next caller tries again. A
/// cached channel that fails `is_usable` is dropped and replaced on the next request.
pub struct ChannelProvider<Ch> {
    slot: RwLock<Option<Ch>>,
}

impl<Ch: Clone> ChannelProvider<Ch> {
    pub fn new() -> Self {
        ChannelProvider {
            slot: RwLock::new(None),
        }
    }

    pub async fn get_or_create<V, F, Fut, E>(&self, is_usable: V, create: F) -> Result<Ch, E>
    where
        V: Fn(&Ch) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Ch, E>>,
    {
        if let Some(ch) = self.slot.read().await.as_ref() {
            if is_usable(ch) {
                return Ok(ch.clone());
            }
        }

        let mut slot = self.slot.write().await;
        // Another caller may have filled or replaced the slot while we waited for the
        // write guard.
        if let Some(ch) = slot.as_ref() {
            if is_usable(ch) {
                debug!("Publish channel created by a concurrent caller, reusing it");
                return Ok(ch.clone());
            }
            warn!("Cached publish channel is no longer usable, discarding it");
            *slot = None;
        }

        let ch = create().await?;
        *slot = Some(ch.clone());
        Ok(ch)
    }

    /// The cached channel, without creating one.
    pub async fn cached(&self) -> Option<Ch> {
        self.slot.read().await.clone()
    }

    /// Empties the slot and hands back whatever was cached.
    pub async fn take(&self) -> Option<Ch> {
        self.slot.write().await.take()
    }
}

impl<Ch: Clone> Default for ChannelProvider<Ch> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn caches_after_first_success() {
        let provider = ChannelProvider::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let ch: Result<u32, ()> = provider
                .get_or_create(|_| true, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(ch, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cached().await, Some(7));
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let provider: ChannelProvider<u32> = ChannelProvider::new();

        let first: Result<u32, &str> = provider
            .get_or_create(|_| true, || async { Err("down") })
            .await;
        assert_eq!(first, Err("down"));
        assert_eq!(provider.cached().await, None);

        let second: Result<u32, &str> = provider
            .get_or_create(|_| true, || async { Ok(1) })
            .await;
        assert_eq!(second, Ok(1));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_creation() {
        let provider = Arc::new(ChannelProvider::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    provider
                        .get_or_create(|_| true, || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, ()>(42u32)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn take_empties_the_slot() {
        let provider = ChannelProvider::new();
        let _ = provider
            .get_or_create(|_| true, || async { Ok::<_, ()>(3u8) })
            .await;

        assert_eq!(provider.take().await, Some(3));
        assert_eq!(provider.cached().await, None);
    }

    #[tokio::test]
    async fn unusable_channel_is_replaced() {
        let provider = ChannelProvider::new();
        let calls = AtomicUsize::new(0);
        let create = || async {
            Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) as u32 + 1)
        };

        assert_eq!(provider.get_or_create(|_| true, create).await, Ok(1));
        // Channel 1 went away underneath us.
        assert_eq!(provider.get_or_create(|ch| *ch != 1, create).await, Ok(2));
        assert_eq!(provider.get_or_create(|ch| *ch != 1, create).await, Ok(2));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.cached().await, Some(2));
    }
}
