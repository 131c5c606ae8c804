use serde::Serialize;

use crate::problem::SchedulingProblem;
use crate::solver::allocation::Allocation;

/// Per-resource aggregates of one finalized allocation.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatistics {
    pub resource_id: usize,
    pub total_distance_km: f64,
    pub trip_count: usize,
    /// First start to last end, in hours.
    pub active_hours: f64,
    pub idle_minutes: f64,
    pub fuel_cost: f64,
    pub emissions_kg: f64,
    pub overlap_count: usize,
}

/// Total/min/max/mean over the used resources for one metric.
#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct MetricSummary {
    pub total: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl MetricSummary {
    fn over(values: impl Iterator<Item = f64>) -> MetricSummary {
        let mut count = 0usize;
        let mut summary = MetricSummary {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ..MetricSummary::default()
        };

        for value in values {
            count += 1;
            summary.total += value;
            summary.min = summary.min.min(value);
            summary.max = summary.max.max(value);
        }

        if count == 0 {
            return MetricSummary::default();
        }

        summary.mean = summary.total / count as f64;
        summary
    }
}

/// Fleet-wide view over a repaired allocation, including the verified overlap
/// count that must be zero for a valid candidate.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleStatistics {
    pub per_resource: Vec<ResourceStatistics>,
    pub used_resources: usize,
    pub total_trips: usize,
    pub total_overlaps: usize,
    pub distance_km: MetricSummary,
    pub active_hours: MetricSummary,
    pub idle_minutes: MetricSummary,
    pub fuel_cost: MetricSummary,
    pub emissions_kg: MetricSummary,
}

/// Computes statistics over the used (non-empty) resources.
pub fn compute(problem: &SchedulingProblem, allocation: &Allocation) -> ScheduleStatistics {
    let catalog = problem.catalog();
    let config = problem.config();
    let buffer = config.turnaround;

    let mut per_resource = Vec::new();

    for resource in allocation.resources() {
        let trips = allocation.sorted_trips(resource, catalog);
        if trips.is_empty() {
            continue;
        }

        let total_distance_km: f64 = trips
            .iter()
            .map(|&t| catalog.trip(t).distance_km())
            .sum();

        let first_start = catalog.trip(trips[0]).start();
        let last_end = trips
            .iter()
            .map(|&t| catalog.trip(t).end())
            .max()
            .expect("non-empty resource");

        let mut idle_minutes = 0.0;
        let mut overlap_count = 0usize;
        for pair in trips.windows(2) {
            let gap = problem.gap(pair[0], pair[1]).as_secs_f64() / 60.0;
            idle_minutes += gap.max(0.0);

            if catalog.trip(pair[0]).end() + buffer > catalog.trip(pair[1]).start() {
                overlap_count += 1;
            }
        }

        per_resource.push(ResourceStatistics {
            resource_id: resource.get(),
            total_distance_km,
            trip_count: trips.len(),
            active_hours: first_start.until(last_end).as_secs_f64() / 3600.0,
            idle_minutes,
            fuel_cost: total_distance_km / config.mileage_km_per_l * config.fuel_price_per_l,
            emissions_kg: total_distance_km * config.emission_kg_per_km,
            overlap_count,
        });
    }

    ScheduleStatistics {
        used_resources: per_resource.len(),
        total_trips: per_resource.iter().map(|r| r.trip_count).sum(),
        total_overlaps: per_resource.iter().map(|r| r.overlap_count).sum(),
        distance_km: MetricSummary::over(per_resource.iter().map(|r| r.total_distance_km)),
        active_hours: MetricSummary::over(per_resource.iter().map(|r| r.active_hours)),
        idle_minutes: MetricSummary::over(per_resource.iter().map(|r| r.idle_minutes)),
        fuel_cost: MetricSummary::over(per_resource.iter().map(|r| r.fuel_cost)),
        emissions_kg: MetricSummary::over(per_resource.iter().map(|r| r.emissions_kg)),
        per_resource,
    }
}
