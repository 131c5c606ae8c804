use std::sync::Arc;

use headway_transit::catalog::TripCatalog;
use headway_transit::oracle::DistanceOracle;
use headway_transit::stop::Stop;
use headway_transit::trip::Trip;
use jiff::SignedDuration;

use crate::config::SchedulerConfig;
use crate::problem::SchedulingProblem;

/// A trip between the two fixture stops.
pub fn trip(id: &str, start: &str, end: &str) -> Trip {
    trip_between(id, start, end, "A", "B")
}

pub fn trip_between(id: &str, start: &str, end: &str, from: &str, to: &str) -> Trip {
    Trip::new(
        id,
        None,
        start.parse().unwrap(),
        end.parse().unwrap(),
        from,
        to,
        5.0,
    )
    .unwrap()
}

pub fn catalog(trips: Vec<Trip>) -> TripCatalog {
    TripCatalog::new(trips)
}

/// Three stops a few kilometres apart.
pub fn stops() -> Vec<Stop> {
    vec![
        Stop::new("A", 28.6139, 77.2090),
        Stop::new("B", 28.6350, 77.2250),
        Stop::new("C", 28.6560, 77.2410),
    ]
}

pub fn config(fleet_size: usize, buffer_minutes: i64) -> SchedulerConfig {
    SchedulerConfig::new(fleet_size, SignedDuration::from_mins(buffer_minutes))
}

pub fn problem(
    trips: Vec<Trip>,
    fleet_size: usize,
    buffer_minutes: i64,
) -> Arc<SchedulingProblem> {
    problem_with_config(trips, config(fleet_size, buffer_minutes))
}

pub fn problem_with_config(trips: Vec<Trip>, config: SchedulerConfig) -> Arc<SchedulingProblem> {
    let oracle = Arc::new(DistanceOracle::new(stops(), config.average_speed_kmh));

    Arc::new(
        SchedulingProblem::new(TripCatalog::new(trips), oracle, config)
            .expect("test problem is valid"),
    )
}
