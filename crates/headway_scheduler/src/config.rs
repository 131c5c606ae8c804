use jiff::SignedDuration;
use serde::Serialize;

/// Weights of the fitness terms. Every term is a cost: the search minimizes
/// the weighted sum, so lower is better for each of them.
///
/// `overlap` multiplies a raw overlap count while the other weights apply to
/// values normalized into `[0, 1]`, which keeps any overlapping allocation
/// ranked strictly worse than any overlap-free one.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FitnessWeights {
    /// Fraction of the fleet actually used. Counted as a cost: the goal
    /// direction is fleet minimization.
    pub resource_usage: f64,
    /// Normalized idle time between consecutive trips on one resource.
    pub idle: f64,
    /// Normalized deadhead distance between consecutive trips' endpoints.
    pub deadhead: f64,
    /// Normalized count of turnarounds shorter than the required travel time.
    pub infeasible_turnaround: f64,
    /// Per-overlap penalty, applied to the raw count.
    pub overlap: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        FitnessWeights {
            resource_usage: 1.0,
            idle: 1.0,
            deadhead: 1.0,
            infeasible_turnaround: 10.0,
            overlap: 1000.0,
        }
    }
}

/// Upper bounds used to normalize the accumulated fitness terms.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FitnessNorms {
    pub max_idle_minutes: f64,
    pub max_deadhead_km: f64,
    pub max_infeasible_turnarounds: f64,
}

impl Default for FitnessNorms {
    fn default() -> Self {
        FitnessNorms {
            max_idle_minutes: 250_000.0,
            max_deadhead_km: 120_000.0,
            max_infeasible_turnarounds: 5_000.0,
        }
    }
}

/// Immutable run configuration, threaded explicitly into every component.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerConfig {
    /// Number of resource slots (vehicles or drivers) available to the run.
    pub fleet_size: usize,

    /// Minimum turnaround between consecutive trips on one resource. There is
    /// no authoritative value for this; it must be supplied per run.
    #[serde(with = "duration_secs")]
    pub turnaround: SignedDuration,

    /// Assumed average speed for deadhead travel-time estimates.
    pub average_speed_kmh: f64,

    pub mileage_km_per_l: f64,
    pub fuel_price_per_l: f64,
    pub emission_kg_per_km: f64,

    pub weights: FitnessWeights,
    pub norms: FitnessNorms,

    /// Bound on repair iterations; repair reports rather than loops forever.
    pub max_repair_passes: usize,

    /// Whether repair may allocate resources beyond `fleet_size`. With a hard
    /// fleet cap, unresolvable conflicts surface as `remaining_overlaps`.
    pub allow_new_resources: bool,
}

impl SchedulerConfig {
    /// Reference cost constants: 50 km/h deadhead speed, 3.7 km/l mileage,
    /// 94.77 per litre, 2.31 kg CO2 per km.
    pub fn new(fleet_size: usize, turnaround: SignedDuration) -> Self {
        SchedulerConfig {
            fleet_size,
            turnaround,
            average_speed_kmh: 50.0,
            mileage_km_per_l: 3.7,
            fuel_price_per_l: 94.77,
            emission_kg_per_km: 2.31,
            weights: FitnessWeights::default(),
            norms: FitnessNorms::default(),
            max_repair_passes: 10,
            allow_new_resources: true,
        }
    }

    pub fn with_fleet_size(mut self, fleet_size: usize) -> Self {
        self.fleet_size = fleet_size;
        self
    }

    pub fn turnaround_seconds(&self) -> i64 {
        self.turnaround.as_secs()
    }
}

mod duration_secs {
    use jiff::SignedDuration;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        duration: &SignedDuration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.as_secs())
    }
}
