use std::sync::Arc;

use headway_transit::catalog::TripCatalog;
use headway_transit::oracle::DistanceOracle;
use headway_transit::trip::TripIdx;
use jiff::SignedDuration;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// One immutable scheduling instance: the trip catalog, the distance oracle,
/// and the run configuration. Shared read-only (behind an `Arc`) between the
/// search, the repair pass, and the analyzer. The oracle is itself shared so
/// concurrent fleet-size runs reuse one memoized distance cache.
pub struct SchedulingProblem {
    catalog: TripCatalog,
    oracle: Arc<DistanceOracle>,
    config: SchedulerConfig,
}

impl SchedulingProblem {
    pub fn new(
        catalog: TripCatalog,
        oracle: Arc<DistanceOracle>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        if config.fleet_size == 0 {
            return Err(SchedulerError::EmptyFleet);
        }

        Ok(SchedulingProblem {
            catalog,
            oracle,
            config,
        })
    }

    pub fn catalog(&self) -> &TripCatalog {
        &self.catalog
    }

    pub fn oracle(&self) -> &DistanceOracle {
        &self.oracle
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn fleet_size(&self) -> usize {
        self.config.fleet_size
    }

    /// Gap between the end of `a` and the start of `b` (may be negative).
    pub fn gap(&self, a: TripIdx, b: TripIdx) -> SignedDuration {
        self.catalog
            .trip(a)
            .end()
            .until(self.catalog.trip(b).start())
    }

    /// Deadhead distance from `a`'s end stop to `b`'s start stop, `None` when
    /// either stop is unknown to the oracle.
    pub fn deadhead_km(&self, a: TripIdx, b: TripIdx) -> Option<f64> {
        self.oracle
            .distance_km(self.catalog.trip(a).end_stop(), self.catalog.trip(b).start_stop())
    }

    /// Minimum travel time from `a`'s end stop to `b`'s start stop.
    pub fn deadhead_travel_time(&self, a: TripIdx, b: TripIdx) -> Option<SignedDuration> {
        self.oracle
            .travel_time(self.catalog.trip(a).end_stop(), self.catalog.trip(b).start_stop())
    }
}
