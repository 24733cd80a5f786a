//! Per-envelope decode cache
//!
//! Each envelope remembers, per requested message type, the outcome of the
//! one decode attempt it made: the decoded value or the failure. Later
//! requests for the same type get the stored outcome back without decoding
//! again, even when the first attempt failed.
//!
//! # Locking
//!
//! The slot map sits behind a `Mutex` that is held only long enough to find
//! or create a slot. Each slot is a `OnceLock`: concurrent requests for the
//! same type wait on that slot while exactly one of them decodes, and
//! requests for different types decode in parallel.
//!
//! A slot whose decode never ran (the envelope was dropped first) stays
//! empty and is simply dropped with the cache.

use rawjson_core::DecodeError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

type Stored = Result<Arc<dyn Any + Send + Sync>, DecodeError>;
type Slot = Arc<OnceLock<Stored>>;

/// Outcome of a decode attempt for one type within one envelope
#[derive(Debug)]
pub enum DecodeAttempt<T> {
    /// The type decoded successfully
    Decoded(Arc<T>),
    /// The type was rejected or did not fit the payload
    Rejected(DecodeError),
    /// Nobody has asked for the type yet
    NotAttempted,
}

impl<T> DecodeAttempt<T> {
    /// True for `Decoded`
    pub fn is_decoded(&self) -> bool {
        matches!(self, DecodeAttempt::Decoded(_))
    }

    /// True for `Rejected`
    pub fn is_rejected(&self) -> bool {
        matches!(self, DecodeAttempt::Rejected(_))
    }

    /// True for `NotAttempted`
    pub fn is_not_attempted(&self) -> bool {
        matches!(self, DecodeAttempt::NotAttempted)
    }
}

/// Counters describing the work one envelope has done
#[derive(Debug, Default)]
pub struct EnvelopeStats {
    decodes: AtomicUsize,
    rejections: AtomicUsize,
    cache_hits: AtomicUsize,
}

/// Point-in-time copy of [`EnvelopeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Decode computations that read the JSON tree
    pub decodes: usize,
    /// Types turned away by the acceptance filter
    pub rejections: usize,
    /// Requests answered from the cache
    pub cache_hits: usize,
}

impl EnvelopeStats {
    pub(crate) fn record_decode(&self) {
        self.decodes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            decodes: self.decodes.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// Memoized decode outcomes keyed by type identity
#[derive(Debug, Default)]
pub struct DecodeCache {
    slots: Mutex<HashMap<TypeId, Slot>>,
    stats: EnvelopeStats,
}

impl DecodeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored outcome for `T`, computing it with `decode` first if needed
    ///
    /// `decode` runs at most once per type for the life of the cache, even
    /// under concurrent callers; its failure is stored like a success.
    pub fn get_or_insert_with<T, F>(&self, decode: F) -> Result<Arc<T>, DecodeError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, DecodeError>,
    {
        let slot = self.slot(TypeId::of::<T>());

        let mut computed = false;
        let stored = slot.get_or_init(|| {
            computed = true;
            decode().map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>)
        });

        if !computed {
            self.stats.record_hit();
            tracing::trace!(target_type = type_name::<T>(), "decode cache hit");
        }

        downcast(stored)
    }

    /// Return the stored outcome for `T` without decoding
    pub fn try_get<T: Send + Sync + 'static>(&self) -> Option<Result<Arc<T>, DecodeError>> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()?;

        slot.get().map(downcast)
    }

    /// Current state of `T`'s slot
    pub fn attempt<T: Send + Sync + 'static>(&self) -> DecodeAttempt<T> {
        match self.try_get::<T>() {
            Some(Ok(value)) => DecodeAttempt::Decoded(value),
            Some(Err(error)) => DecodeAttempt::Rejected(error),
            None => DecodeAttempt::NotAttempted,
        }
    }

    /// Number of types with a stored outcome
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// True when no outcome is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Work counters for this cache
    pub fn stats(&self) -> &EnvelopeStats {
        &self.stats
    }

    fn slot(&self, type_id: TypeId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(type_id).or_default())
    }
}

// Slots are keyed by `TypeId::of::<T>()`, so a stored value is always a `T`.
fn downcast<T: Send + Sync + 'static>(stored: &Stored) -> Result<Arc<T>, DecodeError> {
    match stored {
        Ok(value) => Arc::clone(value)
            .downcast::<T>()
            .map_err(|_| DecodeError::cache_mismatch(type_name::<T>())),
        Err(error) => Err(error.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawjson_core::JsonShape;
    use std::thread;

    #[derive(Debug, PartialEq)]
    struct Widget(u32);

    #[derive(Debug, PartialEq)]
    struct Gadget(&'static str);

    #[test]
    fn test_value_is_computed_once() {
        let cache = DecodeCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let widget = cache
                .get_or_insert_with(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Widget(7))
                })
                .unwrap();
            assert_eq!(*widget, Widget(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().snapshot().cache_hits, 2);
    }

    #[test]
    fn test_failure_is_cached() {
        let cache = DecodeCache::new();
        let calls = AtomicUsize::new(0);
        let fail = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Widget, _>(DecodeError::malformed("Widget", JsonShape::Scalar, "nope"))
        };

        let first = cache.get_or_insert_with(fail).unwrap_err();
        let second = cache
            .get_or_insert_with(|| -> Result<Widget, DecodeError> { panic!("must not decode again") })
            .unwrap_err();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.attempt::<Widget>().is_rejected());
    }

    #[test]
    fn test_types_are_independent() {
        let cache = DecodeCache::new();
        cache.get_or_insert_with(|| Ok(Widget(1))).unwrap();
        cache.get_or_insert_with(|| Ok(Gadget("g"))).unwrap();

        assert_eq!(*cache.try_get::<Widget>().unwrap().unwrap(), Widget(1));
        assert_eq!(*cache.try_get::<Gadget>().unwrap().unwrap(), Gadget("g"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_try_get_does_not_decode() {
        let cache = DecodeCache::new();
        assert!(cache.try_get::<Widget>().is_none());
        assert!(cache.attempt::<Widget>().is_not_attempted());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_foreign_value_is_a_cache_mismatch() {
        let stored: Stored = Ok(Arc::new(Gadget("g")));
        let error = downcast::<Widget>(&stored).unwrap_err();

        assert_eq!(error, DecodeError::cache_mismatch(type_name::<Widget>()));
        assert_eq!(error.kind(), "cache_mismatch");
        assert_eq!(error.shape(), None);
        assert!(!error.is_malformed());
    }

    #[test]
    fn test_repeat_lookups_share_the_value() {
        let cache = DecodeCache::new();
        let first = cache.get_or_insert_with(|| Ok(Widget(3))).unwrap();
        let second = cache.get_or_insert_with(|| Ok(Widget(4))).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_requests_decode_once() {
        let cache = Arc::new(DecodeCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_insert_with(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(20));
                            Ok(Widget(9))
                        })
                        .map(|w| w.0)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(9));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().snapshot().cache_hits, 7);
    }
}
