/// A fixed boarding location, loaded once from the stops reference table.
#[derive(Debug, Clone)]
pub struct Stop {
    id: String,
    point: geo::Point,
}

impl Stop {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Stop {
            id: id.into(),
            point: geo::Point::new(lon, lat),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn point(&self) -> geo::Point {
        self.point
    }
}
