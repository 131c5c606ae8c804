use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::TripCatalog;
use crate::error::TransitError;
use crate::service_time::ServiceTime;
use crate::stop::Stop;
use crate::trip::Trip;

/// One stop visit from the raw timetable (`stop_times`-style input).
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableRow {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub arrival_time: String,
    pub departure_time: String,
    #[serde(default)]
    pub shape_dist_traveled: Option<f64>,
    #[serde(default)]
    pub route_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    stop_lat: f64,
    stop_lon: f64,
}

/// One resolved trip, as exported by the catalog stage and re-read by later
/// stages.
#[derive(Debug, Serialize, Deserialize)]
pub struct TripRow {
    pub trip_id: String,
    pub route_id: Option<String>,
    pub start_time: ServiceTime,
    pub end_time: ServiceTime,
    pub start_stop: String,
    pub end_stop: String,
    pub distance_km: f64,
}

fn open(path: &Path) -> Result<BufReader<File>, TransitError> {
    let file = File::open(path).map_err(|source| TransitError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(BufReader::new(file))
}

fn create(path: &Path) -> Result<BufWriter<File>, TransitError> {
    let file = File::create(path).map_err(|source| TransitError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(BufWriter::new(file))
}

/// Reads the stops reference table, dropping malformed rows.
pub fn read_stops(path: &Path) -> Result<Vec<Stop>, TransitError> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let mut stops = Vec::new();

    for record in reader.deserialize::<StopRow>() {
        match record {
            Ok(row) => stops.push(Stop::new(row.stop_id, row.stop_lat, row.stop_lon)),
            Err(error) => warn!(%error, "dropping malformed stop row"),
        }
    }

    if stops.is_empty() {
        return Err(TransitError::EmptyStops);
    }

    Ok(stops)
}

/// Reads raw timetable rows, dropping malformed rows.
pub fn read_timetable(path: &Path) -> Result<Vec<TimetableRow>, TransitError> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let mut rows = Vec::new();

    for record in reader.deserialize::<TimetableRow>() {
        match record {
            Ok(row) => rows.push(row),
            Err(error) => warn!(%error, "dropping malformed timetable row"),
        }
    }

    Ok(rows)
}

/// Reads a resolved trips table into a catalog.
pub fn read_trips(path: &Path) -> Result<TripCatalog, TransitError> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let mut trips = Vec::new();

    for record in reader.deserialize::<TripRow>() {
        let row = match record {
            Ok(row) => row,
            Err(error) => {
                warn!(%error, "dropping malformed trip row");
                continue;
            }
        };

        match Trip::new(
            row.trip_id,
            row.route_id,
            row.start_time,
            row.end_time,
            row.start_stop,
            row.end_stop,
            row.distance_km,
        ) {
            Ok(trip) => trips.push(trip),
            Err(error) => warn!(%error, "dropping unusable trip row"),
        }
    }

    if trips.is_empty() {
        return Err(TransitError::EmptyCatalog);
    }

    Ok(TripCatalog::new(trips))
}

/// Exports a catalog as the resolved trips artifact.
pub fn write_trips<W: Write>(writer: W, catalog: &TripCatalog) -> Result<(), TransitError> {
    let mut writer = csv::Writer::from_writer(writer);

    for trip in catalog.trips() {
        writer.serialize(TripRow {
            trip_id: trip.id().to_owned(),
            route_id: trip.route_id().map(str::to_owned),
            start_time: trip.start(),
            end_time: trip.end(),
            start_stop: trip.start_stop().to_owned(),
            end_stop: trip.end_stop().to_owned(),
            distance_km: trip.distance_km(),
        })?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes a catalog to a file path.
pub fn write_trips_to_path(path: &Path, catalog: &TripCatalog) -> Result<(), TransitError> {
    write_trips(create(path)?, catalog)
}
