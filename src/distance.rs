//! Site-to-rupture distance metrics.
//!
//! Every metric returns an S×E matrix in kilometres floored at
//! [`DISTANCE_LIMIT`]; the floor is applied after the raw geometric distance
//! is known. Horizontal (Rx) distance is the only signed metric: its magnitude
//! is floored and its sign kept.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, RiskError};
use crate::projection::Projection;
use crate::shape::{broadcast_row, outer_map};
use crate::types::{Ruptures, Sites};

/// Smallest distance any metric reports (km).
pub const DISTANCE_LIMIT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Epicentral,
    Hypocentral,
    JoynerBoore,
    Rupture,
    /// Joyner–Boore measured from the local centroid; kept for numerical
    /// comparison with an external reference tool.
    MendezJoynerBoore,
    /// Closest point on the infinite plane truncated to the rupture edges.
    MendezRupture,
    /// Signed across-strike distance (Rx), positive on the hanging wall.
    Horizontal,
}

impl DistanceMetric {
    pub const ALL: [DistanceMetric; 7] = [
        DistanceMetric::Epicentral,
        DistanceMetric::Hypocentral,
        DistanceMetric::JoynerBoore,
        DistanceMetric::Rupture,
        DistanceMetric::MendezJoynerBoore,
        DistanceMetric::MendezRupture,
        DistanceMetric::Horizontal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DistanceMetric::Epicentral => "epicentral",
            DistanceMetric::Hypocentral => "hypocentral",
            DistanceMetric::JoynerBoore => "joyner_boore",
            DistanceMetric::Rupture => "rupture",
            DistanceMetric::MendezJoynerBoore => "mendez_joyner_boore",
            DistanceMetric::MendezRupture => "mendez_rupture",
            DistanceMetric::Horizontal => "horizontal",
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, DistanceMetric::Horizontal)
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = RiskError;

    /// Case-insensitive; `-` and `_` are interchangeable. `rx` aliases `horizontal`.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        if key == "rx" {
            return Ok(DistanceMetric::Horizontal);
        }
        DistanceMetric::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| RiskError::InvalidConfig(format!("unknown distance metric '{s}'")))
    }
}

/// Compute `metric` between every site and every rupture.
#[instrument(skip_all, fields(metric = %metric, sites = sites.len(), events = ruptures.len()))]
pub fn distance_matrix<P: Projection + ?Sized>(
    metric: DistanceMetric,
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    let out = match metric {
        DistanceMetric::Epicentral => epicentral(sites, ruptures, projection),
        DistanceMetric::Hypocentral => hypocentral(sites, ruptures, projection),
        DistanceMetric::JoynerBoore => joyner_boore(sites, ruptures, projection),
        DistanceMetric::Rupture => rupture(sites, ruptures, projection),
        DistanceMetric::MendezJoynerBoore => mendez_joyner_boore(sites, ruptures, projection),
        DistanceMetric::MendezRupture => mendez_rupture(sites, ruptures, projection),
        DistanceMetric::Horizontal => horizontal(sites, ruptures, projection),
    }?;
    debug!(shape = ?out.dim(), "distance matrix computed");
    Ok(out)
}

pub fn epicentral<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    let raw = raw_epicentral(sites, ruptures, projection)?;
    Ok(raw.mapv(floor_distance))
}

pub fn hypocentral<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    let raw = raw_epicentral(sites, ruptures, projection)?;
    let depth = broadcast_row(&ruptures.depth, sites.len());
    Ok(ndarray::Zip::from(&raw).and(&depth).map_collect(|&r, &d| floor_distance(r.hypot(d))))
}

/// Closest horizontal distance to the surface projection of the rupture.
pub fn joyner_boore<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    check_inputs(sites, ruptures)?;
    let frame = Frames { sites, ruptures, projection };
    outer_map(sites.len(), ruptures.len(), |i, j| {
        let (x, y) = frame.trace_start(i, j)?;
        let (cx, cy) = frame.footprint_centre(j);
        let dx = excess(x - cx, ruptures.length[j] / 2.0);
        let dy = excess(y - cy, footprint_half_width(ruptures, j));
        Ok(floor_distance(dx.hypot(dy)))
    })
}

/// Closest 3-D distance to the finite rupture plane.
pub fn rupture<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    check_inputs(sites, ruptures)?;
    let frame = Frames { sites, ruptures, projection };
    outer_map(sites.len(), ruptures.len(), |i, j| {
        let (x, y) = frame.trace_start(i, j)?;
        let (cx, _) = frame.footprint_centre(j);
        let (sin_d, cos_d) = ruptures.dip[j].to_radians().sin_cos();
        let top = ruptures.depth_to_top[j];
        // Rotate about the trace so the plane lies along +y' from the top edge.
        let y_rot = y * cos_d - top * sin_d;
        let z_rot = y * sin_d + top * cos_d;
        let half_width = ruptures.width[j] / 2.0;
        let dx = excess(x - cx, ruptures.length[j] / 2.0);
        let dy = excess(y_rot - half_width, half_width);
        Ok(floor_distance((dx * dx + dy * dy + z_rot * z_rot).sqrt()))
    })
}

/// Joyner–Boore distance measured from the rupture's local centroid.
pub fn mendez_joyner_boore<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    check_inputs(sites, ruptures)?;
    let frame = Frames { sites, ruptures, projection };
    outer_map(sites.len(), ruptures.len(), |i, j| {
        let (x, y) = frame.centroid(i, j)?;
        let dx = excess(x, ruptures.length[j] / 2.0);
        let dy = excess(y, footprint_half_width(ruptures, j));
        Ok(floor_distance(dx.hypot(dy)))
    })
}

/// Rupture distance from the closest point on the infinite plane through the
/// centroid, truncated to the rupture's edges.
pub fn mendez_rupture<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    check_inputs(sites, ruptures)?;
    let frame = Frames { sites, ruptures, projection };
    outer_map(sites.len(), ruptures.len(), |i, j| {
        let (x, y) = frame.centroid(i, j)?;
        let (sin_d, cos_d) = ruptures.dip[j].to_radians().sin_cos();
        let depth = ruptures.depth[j];
        let half_length = ruptures.length[j] / 2.0;
        let half_width = ruptures.width[j] / 2.0;

        // Down-dip offset of the site's foot on the infinite plane.
        let down_dip = y * cos_d - depth * sin_d;
        let along = x.clamp(-half_length, half_length);
        let down = down_dip.clamp(-half_width, half_width);
        // Bottom edge sits W·sin(dip)/2 below the centroid, top edge the same above.
        let point_depth = if down_dip >= half_width {
            depth + half_width * sin_d
        } else if down_dip <= -half_width {
            depth - half_width * sin_d
        } else {
            depth + down * sin_d
        };

        let dx = x - along;
        let dy = y - down * cos_d;
        Ok(floor_distance((dx * dx + dy * dy + point_depth * point_depth).sqrt()))
    })
}

/// Signed across-strike distance from the extended trace (Rx).
pub fn horizontal<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    check_inputs(sites, ruptures)?;
    let frame = Frames { sites, ruptures, projection };
    outer_map(sites.len(), ruptures.len(), |i, j| {
        let (_, y) = frame.trace_start(i, j)?;
        Ok(floor_signed(y))
    })
}

pub fn floor_distance(d: f64) -> f64 {
    if d < DISTANCE_LIMIT { DISTANCE_LIMIT } else { d }
}

/// Floor the magnitude, keep the sign. Zero counts as positive.
pub fn floor_signed(d: f64) -> f64 {
    if d.abs() < DISTANCE_LIMIT {
        DISTANCE_LIMIT.copysign(d)
    } else {
        d
    }
}

/// How far `offset` lies beyond a half-extent; zero inside the extent.
fn excess(offset: f64, half_extent: f64) -> f64 {
    (offset.abs() - half_extent).max(0.0)
}

fn footprint_half_width(ruptures: &Ruptures, j: usize) -> f64 {
    ruptures.width[j] * ruptures.dip[j].to_radians().cos() / 2.0
}

fn check_inputs(sites: &Sites, ruptures: &Ruptures) -> Result<()> {
    sites.validate()?;
    ruptures.validate()
}

fn raw_epicentral<P: Projection + ?Sized>(
    sites: &Sites,
    ruptures: &Ruptures,
    projection: &P,
) -> Result<Array2<f64>> {
    check_inputs(sites, ruptures)?;
    outer_map(sites.len(), ruptures.len(), |i, j| {
        let (x, y) = projection.angular_to_cartesian(
            sites.latitude[i],
            sites.longitude[i],
            ruptures.latitude[j],
            ruptures.longitude[j],
            ruptures.azimuth[j],
        )?;
        Ok(x.hypot(y))
    })
}

/// Local frames a site can be expressed in for one rupture.
struct Frames<'a, P: ?Sized> {
    sites: &'a Sites,
    ruptures: &'a Ruptures,
    projection: &'a P,
}

impl<P: Projection + ?Sized> Frames<'_, P> {
    fn project(&self, i: usize, origin_lat: f64, origin_lon: f64, j: usize) -> Result<(f64, f64)> {
        self.projection.angular_to_cartesian(
            self.sites.latitude[i],
            self.sites.longitude[i],
            origin_lat,
            origin_lon,
            self.ruptures.azimuth[j],
        )
    }

    /// Origin at the trace start. Without explicit trace starts the frame is
    /// derived from the centroid frame.
    fn trace_start(&self, i: usize, j: usize) -> Result<(f64, f64)> {
        match &self.ruptures.trace_start {
            Some(ts) => self.project(i, ts.latitude[j], ts.longitude[j], j),
            None => {
                let (x, y) = self.centroid(i, j)?;
                let (cx, cy) = self.default_centre(j);
                Ok((x + cx, y + cy))
            }
        }
    }

    /// Origin at the surface projection of the rupture centroid.
    fn centroid(&self, i: usize, j: usize) -> Result<(f64, f64)> {
        match (&self.ruptures.trace_start, &self.ruptures.centroid) {
            (Some(ts), Some(c)) => {
                let (x, y) = self.project(i, ts.latitude[j], ts.longitude[j], j)?;
                Ok((x - c.x[j], y - c.y[j]))
            }
            _ => self.project(i, self.ruptures.latitude[j], self.ruptures.longitude[j], j),
        }
    }

    /// Footprint centre in the trace-start frame.
    fn footprint_centre(&self, j: usize) -> (f64, f64) {
        match &self.ruptures.centroid {
            Some(c) => (c.x[j], c.y[j]),
            None => self.default_centre(j),
        }
    }

    fn default_centre(&self, j: usize) -> (f64, f64) {
        (self.ruptures.length[j] / 2.0, footprint_half_width(self.ruptures, j))
    }
}
