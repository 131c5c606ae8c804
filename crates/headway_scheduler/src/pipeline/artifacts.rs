use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use fxhash::FxHashMap;
use headway_transit::catalog::TripCatalog;
use headway_transit::service_time::ServiceTime;
use headway_transit::trip::Trip;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::statistics::ScheduleStatistics;
use crate::error::SchedulerError;
use crate::repair::RepairReport;
use crate::solver::allocation::{Allocation, ResourceIdx};

/// One assigned trip in an exported allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRow {
    pub resource_id: usize,
    pub trip_id: String,
    pub start_time: ServiceTime,
    pub end_time: ServiceTime,
    pub start_stop: String,
    pub end_stop: String,
    pub distance_km: f64,
}

/// One repair-report line, tagged with the artifact it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReportRow {
    pub filename: String,
    pub original_resources: usize,
    pub repaired_resources: usize,
    pub initial_overlaps: usize,
    pub reassignments: usize,
    pub remaining_overlaps: usize,
    pub resources_with_overlaps: usize,
}

impl RepairReportRow {
    pub fn new(filename: impl Into<String>, report: &RepairReport) -> Self {
        RepairReportRow {
            filename: filename.into(),
            original_resources: report.original_resources,
            repaired_resources: report.repaired_resources,
            initial_overlaps: report.initial_overlaps,
            reassignments: report.reassignments,
            remaining_overlaps: report.remaining_overlaps,
            resources_with_overlaps: report.resources_with_overlaps,
        }
    }
}

/// One vehicle duty span handed to the driver assignment pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRow {
    pub shift_id: String,
    pub vehicle_id: usize,
    pub start_time: ServiceTime,
    pub end_time: ServiceTime,
    pub start_stop: String,
    pub end_stop: String,
    pub distance_km: f64,
}

pub fn allocation_rows(catalog: &TripCatalog, allocation: &Allocation) -> Vec<AllocationRow> {
    let mut rows = Vec::with_capacity(allocation.assigned_trips());

    for resource in allocation.resources() {
        for &trip_index in &allocation.sorted_trips(resource, catalog) {
            let trip = catalog.trip(trip_index);
            rows.push(AllocationRow {
                resource_id: resource.get(),
                trip_id: trip.id().to_owned(),
                start_time: trip.start(),
                end_time: trip.end(),
                start_stop: trip.start_stop().to_owned(),
                end_stop: trip.end_stop().to_owned(),
                distance_km: trip.distance_km(),
            });
        }
    }

    rows
}

pub fn write_rows<W: Write, R: Serialize>(writer: W, rows: &[R]) -> Result<(), SchedulerError> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_rows_to_path<R: Serialize>(path: &Path, rows: &[R]) -> Result<(), SchedulerError> {
    let file = File::create(path).map_err(|source| SchedulerError::Io {
        path: path.to_owned(),
        source,
    })?;
    write_rows(BufWriter::new(file), rows)
}

pub fn write_allocation_to_path(
    path: &Path,
    catalog: &TripCatalog,
    allocation: &Allocation,
) -> Result<(), SchedulerError> {
    write_rows_to_path(path, &allocation_rows(catalog, allocation))
}

pub fn write_statistics_to_path(
    path: &Path,
    statistics: &ScheduleStatistics,
) -> Result<(), SchedulerError> {
    write_rows_to_path(path, &statistics.per_resource)
}

/// Loads an exported allocation back against a catalog, so the repair and
/// analysis stages can re-run on any allocation artifact. Rows naming trips
/// the catalog does not know are dropped and logged.
pub fn read_allocation(path: &Path, catalog: &TripCatalog) -> Result<Allocation, SchedulerError> {
    let file = File::open(path).map_err(|source| SchedulerError::Io {
        path: path.to_owned(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut by_resource: FxHashMap<usize, Vec<_>> = FxHashMap::default();
    let mut max_resource = 0usize;

    for record in reader.deserialize::<AllocationRow>() {
        let row = match record {
            Ok(row) => row,
            Err(error) => {
                warn!(%error, "dropping malformed allocation row");
                continue;
            }
        };

        let Some(trip_index) = catalog.index_of(&row.trip_id) else {
            warn!(trip_id = %row.trip_id, "allocation row names an unknown trip");
            continue;
        };

        max_resource = max_resource.max(row.resource_id);
        by_resource.entry(row.resource_id).or_default().push(trip_index);
    }

    if by_resource.is_empty() {
        return Ok(Allocation::new(0));
    }

    let mut allocation = Allocation::new(max_resource + 1);
    for (resource, trips) in by_resource {
        for trip in trips {
            allocation.push(ResourceIdx::new(resource), trip);
        }
    }
    allocation.normalize(catalog);

    Ok(allocation)
}

/// Collapses each used vehicle into one duty span for the driver pass.
pub fn derive_shifts(
    catalog: &TripCatalog,
    allocation: &Allocation,
) -> Result<Vec<(ResourceIdx, Trip)>, SchedulerError> {
    let mut shifts = Vec::new();

    for resource in allocation.resources() {
        let trips = allocation.sorted_trips(resource, catalog);
        let Some((&first, &last)) = trips.first().zip(trips.last()) else {
            continue;
        };

        let end = trips
            .iter()
            .map(|&t| catalog.trip(t).end())
            .max()
            .expect("non-empty resource");
        let distance_km: f64 = trips.iter().map(|&t| catalog.trip(t).distance_km()).sum();

        let shift = Trip::new(
            format!("shift_{}", resource.get()),
            None,
            catalog.trip(first).start(),
            end,
            catalog.trip(first).start_stop(),
            catalog.trip(last).end_stop(),
            distance_km,
        )
        .map_err(SchedulerError::Transit)?;

        shifts.push((resource, shift));
    }

    Ok(shifts)
}

pub fn shift_rows(shifts: &[(ResourceIdx, Trip)]) -> Vec<ShiftRow> {
    shifts
        .iter()
        .map(|(vehicle, shift)| ShiftRow {
            shift_id: shift.id().to_owned(),
            vehicle_id: vehicle.get(),
            start_time: shift.start(),
            end_time: shift.end(),
            start_stop: shift.start_stop().to_owned(),
            end_stop: shift.end_stop().to_owned(),
            distance_km: shift.distance_km(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use headway_transit::trip::TripIdx;

    use super::*;
    use crate::test_utils;

    fn sample() -> (TripCatalog, Allocation) {
        let catalog = test_utils::catalog(vec![
            test_utils::trip("a", "09:00:00", "09:30:00"),
            test_utils::trip("b", "10:00:00", "10:30:00"),
            test_utils::trip("c", "11:00:00", "11:30:00"),
        ]);

        let mut allocation = Allocation::new(2);
        allocation.push(ResourceIdx::new(0), TripIdx::new(0));
        allocation.push(ResourceIdx::new(0), TripIdx::new(1));
        allocation.push(ResourceIdx::new(1), TripIdx::new(2));

        (catalog, allocation)
    }

    #[test]
    fn test_allocation_rows_are_time_ordered_per_resource() {
        let (catalog, allocation) = sample();
        let rows = allocation_rows(&catalog, &allocation);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].trip_id, "a");
        assert_eq!(rows[1].trip_id, "b");
        assert_eq!(rows[0].resource_id, 0);
        assert_eq!(rows[2].resource_id, 1);
    }

    #[test]
    fn test_allocation_round_trip() {
        let (catalog, allocation) = sample();

        let mut buffer = Vec::new();
        write_rows(&mut buffer, &allocation_rows(&catalog, &allocation)).unwrap();

        let dir = std::env::temp_dir().join("headway_artifacts_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("allocation.csv");
        std::fs::write(&path, &buffer).unwrap();

        let loaded = read_allocation(&path, &catalog).unwrap();
        assert_eq!(loaded.structural_key(), {
            let mut normalized = allocation.clone();
            normalized.normalize(&catalog);
            normalized.structural_key()
        });
    }

    #[test]
    fn test_shift_derivation_spans_each_vehicle() {
        let (catalog, allocation) = sample();
        let shifts = derive_shifts(&catalog, &allocation).unwrap();

        assert_eq!(shifts.len(), 2);

        let (vehicle, shift) = &shifts[0];
        assert_eq!(vehicle.get(), 0);
        assert_eq!(shift.start(), "09:00:00".parse().unwrap());
        assert_eq!(shift.end(), "10:30:00".parse().unwrap());
        assert!((shift.distance_km() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_repair_report_row_carries_all_fields() {
        let report = RepairReport {
            original_resources: 3,
            repaired_resources: 4,
            initial_overlaps: 2,
            reassignments: 2,
            remaining_overlaps: 0,
            resources_with_overlaps: 0,
        };

        let row = RepairReportRow::new("allocation_bus3.csv", &report);
        let mut buffer = Vec::new();
        write_rows(&mut buffer, &[row]).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("filename,original_resources,repaired_resources"));
        assert!(text.contains("allocation_bus3.csv,3,4,2,2,0,0"));
    }
}
