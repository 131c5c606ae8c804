use jiff::SignedDuration;
use serde::Serialize;

use crate::define_index_newtype;
use crate::error::TransitError;
use crate::service_time::ServiceTime;

define_index_newtype!(TripIdx, Trip);

/// One scheduled vehicle movement between two stops at fixed times.
///
/// Built once by the catalog and never mutated afterwards; everything else in
/// the scheduler refers to trips through [`TripIdx`].
#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    id: String,
    route_id: Option<String>,
    start: ServiceTime,
    end: ServiceTime,
    start_stop: String,
    end_stop: String,
    distance_km: f64,
}

impl Trip {
    pub fn new(
        id: impl Into<String>,
        route_id: Option<String>,
        start: ServiceTime,
        end: ServiceTime,
        start_stop: impl Into<String>,
        end_stop: impl Into<String>,
        distance_km: f64,
    ) -> Result<Self, TransitError> {
        let id = id.into();
        if end <= start {
            return Err(TransitError::NonPositiveDuration { id });
        }

        Ok(Trip {
            id,
            route_id,
            start,
            end,
            start_stop: start_stop.into(),
            end_stop: end_stop.into(),
            distance_km,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn route_id(&self) -> Option<&str> {
        self.route_id.as_deref()
    }

    pub fn start(&self) -> ServiceTime {
        self.start
    }

    pub fn end(&self) -> ServiceTime {
        self.end
    }

    pub fn start_stop(&self) -> &str {
        &self.start_stop
    }

    pub fn end_stop(&self) -> &str {
        &self.end_stop
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn duration(&self) -> SignedDuration {
        self.start.until(self.end)
    }
}
