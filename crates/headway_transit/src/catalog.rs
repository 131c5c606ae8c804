use fxhash::FxHashMap;
use tracing::{info, warn};

use crate::error::TransitError;
use crate::service_time::ServiceTime;
use crate::tables::TimetableRow;
use crate::trip::{Trip, TripIdx};

/// The normalized trip catalog: one [`Trip`] per raw trip identifier, ordered
/// by start time.
#[derive(Debug, Clone, Default)]
pub struct TripCatalog {
    trips: Vec<Trip>,
    by_id: FxHashMap<String, TripIdx>,
}

impl TripCatalog {
    /// Builds a catalog from already-resolved trips. Accepts an empty list so
    /// downstream stages can be exercised without data.
    pub fn new(mut trips: Vec<Trip>) -> Self {
        trips.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.id().cmp(b.id())));

        let by_id = trips
            .iter()
            .enumerate()
            .map(|(index, trip)| (trip.id().to_owned(), TripIdx::new(index)))
            .collect();

        TripCatalog { trips, by_id }
    }

    /// Resolves raw timetable rows into one trip per trip identifier.
    ///
    /// A trip's span is its first stop's arrival through its last stop's
    /// departure (rows ordered by stop sequence); its distance is the last
    /// cumulative `shape_dist_traveled` value. Trips with unparseable times
    /// or a non-positive duration are dropped and logged, never kept with
    /// wrong times. Only a catalog with no usable trips at all is an error.
    pub fn from_timetable(
        rows: Vec<TimetableRow>,
        distance_in_meters: bool,
    ) -> Result<Self, TransitError> {
        let mut by_trip: FxHashMap<String, Vec<TimetableRow>> = FxHashMap::default();
        for row in rows {
            by_trip.entry(row.trip_id.clone()).or_default().push(row);
        }

        let total = by_trip.len();
        let mut dropped = 0usize;
        let mut trips = Vec::with_capacity(total);

        for (trip_id, mut stop_rows) in by_trip {
            stop_rows.sort_by_key(|row| row.stop_sequence);

            match resolve_trip(&trip_id, &stop_rows, distance_in_meters) {
                Ok(trip) => trips.push(trip),
                Err(error) => {
                    dropped += 1;
                    warn!(trip_id, %error, "dropping unusable trip");
                }
            }
        }

        if trips.is_empty() {
            return Err(TransitError::EmptyCatalog);
        }

        info!(kept = trips.len(), dropped, "trip catalog built");

        Ok(TripCatalog::new(trips))
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn trip(&self, index: TripIdx) -> &Trip {
        &self.trips[index]
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn index_of(&self, trip_id: &str) -> Option<TripIdx> {
        self.by_id.get(trip_id).copied()
    }

    pub fn indices(&self) -> impl Iterator<Item = TripIdx> + '_ {
        (0..self.trips.len()).map(TripIdx::new)
    }
}

fn resolve_trip(
    trip_id: &str,
    stop_rows: &[TimetableRow],
    distance_in_meters: bool,
) -> Result<Trip, TransitError> {
    let first = stop_rows.first().ok_or_else(|| TransitError::NoStopRows {
        id: trip_id.to_owned(),
    })?;
    let last = stop_rows.last().expect("non-empty after first()");

    let start: ServiceTime = first.arrival_time.parse()?;
    let end: ServiceTime = last.departure_time.parse()?;

    let mut distance = stop_rows
        .iter()
        .rev()
        .find_map(|row| row.shape_dist_traveled)
        .unwrap_or(0.0);
    if distance_in_meters {
        distance /= 1000.0;
    }

    Trip::new(
        trip_id,
        first.route_id.clone(),
        start,
        end,
        first.stop_id.clone(),
        last.stop_id.clone(),
        distance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(trip_id: &str, stop_id: &str, seq: u32, arrival: &str, departure: &str) -> TimetableRow {
        TimetableRow {
            trip_id: trip_id.to_owned(),
            stop_id: stop_id.to_owned(),
            stop_sequence: seq,
            arrival_time: arrival.to_owned(),
            departure_time: departure.to_owned(),
            shape_dist_traveled: Some(seq as f64 * 1000.0),
            route_id: None,
        }
    }

    #[test]
    fn test_resolves_first_and_last_stop() {
        let rows = vec![
            row("t1", "S2", 2, "09:10:00", "09:11:00"),
            row("t1", "S1", 1, "09:00:00", "09:01:00"),
            row("t1", "S3", 3, "09:20:00", "09:21:00"),
        ];

        let catalog = TripCatalog::from_timetable(rows, true).unwrap();
        assert_eq!(catalog.len(), 1);

        let trip = catalog.trip(TripIdx::new(0));
        assert_eq!(trip.start(), "09:00:00".parse().unwrap());
        assert_eq!(trip.end(), "09:21:00".parse().unwrap());
        assert_eq!(trip.start_stop(), "S1");
        assert_eq!(trip.end_stop(), "S3");
        assert!((trip.distance_km() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_drops_trip_with_bad_times() {
        let rows = vec![
            row("bad", "S1", 1, "not-a-time", "09:01:00"),
            row("ok", "S1", 1, "09:00:00", "09:01:00"),
            row("ok", "S2", 2, "09:30:00", "09:31:00"),
        ];

        let catalog = TripCatalog::from_timetable(rows, false).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.index_of("bad").is_none());
        assert!(catalog.index_of("ok").is_some());
    }

    #[test]
    fn test_drops_trip_ending_before_start() {
        let rows = vec![
            row("backwards", "S1", 1, "10:00:00", "10:00:00"),
            row("backwards", "S2", 2, "09:00:00", "09:00:00"),
            row("ok", "S1", 1, "09:00:00", "09:01:00"),
            row("ok", "S2", 2, "09:30:00", "09:31:00"),
        ];

        let catalog = TripCatalog::from_timetable(rows, false).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.index_of("backwards").is_none());
    }

    #[test]
    fn test_all_unusable_is_an_error() {
        let rows = vec![row("bad", "S1", 1, "nope", "09:01:00")];
        assert!(matches!(
            TripCatalog::from_timetable(rows, false),
            Err(TransitError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_catalog_is_start_time_ordered() {
        let trips = vec![
            Trip::new(
                "late",
                None,
                "12:00:00".parse().unwrap(),
                "13:00:00".parse().unwrap(),
                "A",
                "B",
                1.0,
            )
            .unwrap(),
            Trip::new(
                "early",
                None,
                "06:00:00".parse().unwrap(),
                "07:00:00".parse().unwrap(),
                "A",
                "B",
                1.0,
            )
            .unwrap(),
        ];

        let catalog = TripCatalog::new(trips);
        assert_eq!(catalog.trip(TripIdx::new(0)).id(), "early");
        assert_eq!(catalog.trip(TripIdx::new(1)).id(), "late");
    }
}
