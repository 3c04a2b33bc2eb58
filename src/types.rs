use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::shape::{expect_finite, expect_len};

/// Portfolio sites as parallel latitude/longitude columns (degrees).
/// Read-only for the duration of a risk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sites {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

impl Sites {
    pub fn new(latitude: Vec<f64>, longitude: Vec<f64>) -> Result<Self> {
        let sites = Sites { latitude, longitude };
        sites.validate()?;
        Ok(sites)
    }

    pub fn validate(&self) -> Result<()> {
        expect_len("site longitude", self.latitude.len(), self.longitude.len())?;
        expect_finite("site latitude", &self.latitude)?;
        expect_finite("site longitude", &self.longitude)
    }

    pub fn len(&self) -> usize {
        self.latitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty()
    }
}

/// Geometry of one rupture, used to build a `Ruptures` table row by row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuptureGeometry {
    /// Surface projection of the rupture centroid (degrees).
    pub latitude: f64,
    pub longitude: f64,
    /// Along-strike extent (km).
    pub length: f64,
    /// Down-dip extent (km).
    pub width: f64,
    /// Trace heading, degrees clockwise from north.
    pub azimuth: f64,
    /// Degrees below horizontal, dipping to the right of the azimuth.
    pub dip: f64,
    /// Depth to centroid (km).
    pub depth: f64,
    /// Depth to top of rupture (km).
    pub depth_to_top: f64,
}

/// Trace-start coordinates, one pair per event (degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStarts {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

/// Rupture centroids in the trace-start frame, one pair per event (km).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalCentroids {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Stochastic event set as parallel columns indexed by event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ruptures {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub length: Vec<f64>,
    pub width: Vec<f64>,
    pub azimuth: Vec<f64>,
    pub dip: Vec<f64>,
    pub depth: Vec<f64>,
    pub depth_to_top: Vec<f64>,
    pub trace_start: Option<TraceStarts>,
    pub centroid: Option<LocalCentroids>,
}

impl Ruptures {
    pub fn from_rows(rows: &[RuptureGeometry]) -> Self {
        Ruptures {
            latitude: rows.iter().map(|r| r.latitude).collect(),
            longitude: rows.iter().map(|r| r.longitude).collect(),
            length: rows.iter().map(|r| r.length).collect(),
            width: rows.iter().map(|r| r.width).collect(),
            azimuth: rows.iter().map(|r| r.azimuth).collect(),
            dip: rows.iter().map(|r| r.dip).collect(),
            depth: rows.iter().map(|r| r.depth).collect(),
            depth_to_top: rows.iter().map(|r| r.depth_to_top).collect(),
            trace_start: None,
            centroid: None,
        }
    }

    pub fn with_trace_start(mut self, latitude: Vec<f64>, longitude: Vec<f64>) -> Self {
        self.trace_start = Some(TraceStarts { latitude, longitude });
        self
    }

    pub fn with_centroid(mut self, x: Vec<f64>, y: Vec<f64>) -> Self {
        self.centroid = Some(LocalCentroids { x, y });
        self
    }

    pub fn len(&self) -> usize {
        self.latitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty()
    }

    /// Every column must carry one finite entry per event; extents must be non-negative.
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        let columns: [(&'static str, &[f64]); 8] = [
            ("rupture latitude", &self.latitude),
            ("rupture longitude", &self.longitude),
            ("rupture length", &self.length),
            ("rupture width", &self.width),
            ("rupture azimuth", &self.azimuth),
            ("rupture dip", &self.dip),
            ("rupture depth", &self.depth),
            ("rupture depth to top", &self.depth_to_top),
        ];
        for (what, column) in columns {
            expect_len(what, n, column.len())?;
            expect_finite(what, column)?;
        }
        if let Some(ts) = &self.trace_start {
            expect_len("trace start latitude", n, ts.latitude.len())?;
            expect_len("trace start longitude", n, ts.longitude.len())?;
            expect_finite("trace start latitude", &ts.latitude)?;
            expect_finite("trace start longitude", &ts.longitude)?;
        }
        if let Some(c) = &self.centroid {
            expect_len("centroid x", n, c.x.len())?;
            expect_len("centroid y", n, c.y.len())?;
            expect_finite("centroid x", &c.x)?;
            expect_finite("centroid y", &c.y)?;
        }
        for (what, column) in [("rupture length", &self.length), ("rupture width", &self.width)] {
            if let Some((index, &value)) = column.iter().enumerate().find(|(_, v)| **v < 0.0) {
                return Err(RiskError::InvalidInput { what, index, value });
            }
        }
        Ok(())
    }

    pub fn geometry(&self, event: usize) -> RuptureGeometry {
        RuptureGeometry {
            latitude: self.latitude[event],
            longitude: self.longitude[event],
            length: self.length[event],
            width: self.width[event],
            azimuth: self.azimuth[event],
            dip: self.dip[event],
            depth: self.depth[event],
            depth_to_top: self.depth_to_top[event],
        }
    }
}
