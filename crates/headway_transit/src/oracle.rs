use fxhash::FxHashMap;
use geo::{Distance, Haversine};
use jiff::SignedDuration;
use parking_lot::RwLock;
use tracing::warn;

use crate::stop::Stop;

/// Great-circle distance and minimum inter-trip travel time between stops.
///
/// Sits in the innermost loop of fitness evaluation, so results are memoized
/// per unordered stop pair, since coordinates never change after loading.
/// Unknown
/// stop ids yield `None` and the caller treats the leg as a neutral, zero-cost
/// contribution; one bad coordinate must never abort a search.
pub struct DistanceOracle {
    stops: Vec<Stop>,
    index: FxHashMap<String, usize>,
    cache: RwLock<FxHashMap<(usize, usize), f64>>,
    average_speed_kmh: f64,
}

impl DistanceOracle {
    pub fn new(stops: Vec<Stop>, average_speed_kmh: f64) -> Self {
        let mut index = FxHashMap::default();
        for (i, stop) in stops.iter().enumerate() {
            if index.insert(stop.id().to_owned(), i).is_some() {
                warn!(stop_id = stop.id(), "duplicate stop id, keeping the last");
            }
        }

        DistanceOracle {
            stops,
            index,
            cache: RwLock::new(FxHashMap::default()),
            average_speed_kmh,
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn knows(&self, stop_id: &str) -> bool {
        self.index.contains_key(stop_id)
    }

    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
    }

    /// Haversine distance in kilometres, `None` when either stop is unknown.
    pub fn distance_km(&self, from: &str, to: &str) -> Option<f64> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;

        let key = (a.min(b), a.max(b));
        if let Some(&cached) = self.cache.read().get(&key) {
            return Some(cached);
        }

        let meters = Haversine.distance(self.stops[a].point(), self.stops[b].point());
        let km = meters / 1000.0;

        self.cache.write().insert(key, km);
        Some(km)
    }

    /// Minimum travel time between two stops at the configured average speed.
    pub fn travel_time(&self, from: &str, to: &str) -> Option<SignedDuration> {
        let km = self.distance_km(from, to)?;
        let hours = km / self.average_speed_kmh;
        Some(SignedDuration::from_secs_f64(hours * 3600.0))
    }
}
