use std::collections::HashMap;

/// Delays already measured, keyed by exact departure time.
///
/// Two probes sent at the same instant observe the same network state:
/// the second one reuses the first sample instead of drawing a new one.
/// Keys are compared bit for bit, except that `0.0` and `-0.0` are the
/// same instant.
#[derive(Debug, Default)]
pub(crate) struct DelayCache {
    delays: HashMap<u64, f64>,
}

impl DelayCache {
    fn key(departure_time: f64) -> u64 {
        // -0.0 + 0.0 == +0.0
        (departure_time + 0.0).to_bits()
    }

    /// Cached delay for `departure_time`, sampling (and storing) one with
    /// `sample` on a miss. Nothing is stored if `sample` fails.
    pub(crate) fn get_or_try_insert_with<E>(
        &mut self,
        departure_time: f64,
        sample: impl FnOnce() -> Result<f64, E>,
    ) -> Result<f64, E> {
        let key = Self::key(departure_time);
        if let Some(delay) = self.delays.get(&key) {
            tracing::trace!(departure_time, delay, "delay cache hit");
            return Ok(*delay);
        }

        let delay = sample()?;
        self.delays.insert(key, delay);
        Ok(delay)
    }

    pub(crate) fn get(&self, departure_time: f64) -> Option<f64> {
        self.delays.get(&Self::key(departure_time)).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.delays.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn samples_once_per_instant() {
        let mut cache = DelayCache::default();
        let mut calls = 0;

        for _ in 0..3 {
            let delay = cache
                .get_or_try_insert_with(1.25, || {
                    calls += 1;
                    Ok::<_, Infallible>(7.0)
                })
                .unwrap();
            assert_eq!(delay, 7.0);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn signed_zero_is_one_key() {
        let mut cache = DelayCache::default();
        cache
            .get_or_try_insert_with(-0.0, || Ok::<_, Infallible>(3.0))
            .unwrap();
        assert_eq!(cache.get(0.0), Some(3.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn close_instants_are_distinct() {
        let mut cache = DelayCache::default();
        cache
            .get_or_try_insert_with(0.1 + 0.2, || Ok::<_, Infallible>(1.0))
            .unwrap();
        assert_eq!(cache.get(0.3), None);
    }

    #[test]
    fn failed_sample_is_not_stored() {
        let mut cache = DelayCache::default();
        assert!(cache.get_or_try_insert_with(1.0, || Err("no edge")).is_err());
        assert_eq!(cache.len(), 0);
    }
}
