use crate::error::{Result, RiskError};

/// Mean earth radius used for site/rupture projections (km).
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Converts a geographic point into local planar kilometres around an origin.
///
/// The returned frame is rotated so that +x runs along `azimuth` (degrees
/// clockwise from north) and +y lies 90° clockwise of it, the hanging-wall
/// side of a rupture dipping to the right of its trace.
pub trait Projection: Sync {
    fn angular_to_cartesian(
        &self,
        latitude: f64,
        longitude: f64,
        origin_latitude: f64,
        origin_longitude: f64,
        azimuth: f64,
    ) -> Result<(f64, f64)>;
}

/// Rotate east/north offsets into the along/across-azimuth frame.
pub fn rotate_to_azimuth(east: f64, north: f64, azimuth: f64) -> (f64, f64) {
    let (sin_a, cos_a) = azimuth.to_radians().sin_cos();
    (north * cos_a + east * sin_a, east * cos_a - north * sin_a)
}

/// Spherical azimuthal-orthographic projection centred on the origin.
/// Accurate for the few-hundred-kilometre site/rupture separations used in
/// attenuation; points on the far hemisphere are rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthalOrthographic {
    pub radius: f64,
}

impl Default for AzimuthalOrthographic {
    fn default() -> Self {
        AzimuthalOrthographic { radius: EARTH_RADIUS_KM }
    }
}

impl Projection for AzimuthalOrthographic {
    fn angular_to_cartesian(
        &self,
        latitude: f64,
        longitude: f64,
        origin_latitude: f64,
        origin_longitude: f64,
        azimuth: f64,
    ) -> Result<(f64, f64)> {
        let inputs = [latitude, longitude, origin_latitude, origin_longitude, azimuth];
        if inputs.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::Projection(format!("non-finite input {inputs:?}")));
        }
        let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
        let (sin_lat0, cos_lat0) = origin_latitude.to_radians().sin_cos();
        let (sin_dlon, cos_dlon) = (longitude - origin_longitude).to_radians().sin_cos();

        // Cosine of the angular distance from the origin.
        let cos_c = sin_lat0 * sin_lat + cos_lat0 * cos_lat * cos_dlon;
        if cos_c < 0.0 {
            return Err(RiskError::Projection(format!(
                "({latitude}, {longitude}) is beyond the horizon of ({origin_latitude}, {origin_longitude})"
            )));
        }

        let east = self.radius * cos_lat * sin_dlon;
        let north = self.radius * (cos_lat0 * sin_lat - sin_lat0 * cos_lat * cos_dlon);
        Ok(rotate_to_azimuth(east, north, azimuth))
    }
}

/// Treats latitude and longitude as planar north/east kilometres.
/// Used for synthetic fault geometry where coordinates are already local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Planar;

impl Projection for Planar {
    fn angular_to_cartesian(
        &self,
        latitude: f64,
        longitude: f64,
        origin_latitude: f64,
        origin_longitude: f64,
        azimuth: f64,
    ) -> Result<(f64, f64)> {
        Ok(rotate_to_azimuth(longitude - origin_longitude, latitude - origin_latitude, azimuth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn origin_maps_to_zero() {
        let p = AzimuthalOrthographic::default();
        let (x, y) = p.angular_to_cartesian(-35.0, 149.0, -35.0, 149.0, 123.0).unwrap();
        assert!(close(x, 0.0, 1e-9) && close(y, 0.0, 1e-9));
    }

    #[test]
    fn one_degree_north_is_along_strike_for_zero_azimuth() {
        let p = AzimuthalOrthographic::default();
        let (x, y) = p.angular_to_cartesian(1.0, 0.0, 0.0, 0.0, 0.0).unwrap();
        let expected = EARTH_RADIUS_KM * 1.0_f64.to_radians().sin();
        assert!(close(x, expected, 1e-9), "x={x}");
        assert!(close(y, 0.0, 1e-9), "y={y}");
    }

    #[test]
    fn east_is_right_of_a_northward_trace() {
        let (x, y) = Planar.angular_to_cartesian(0.0, 5.0, 0.0, 0.0, 0.0).unwrap();
        assert!(close(x, 0.0, 1e-12));
        assert!(close(y, 5.0, 1e-12));
    }

    #[test]
    fn rotation_by_ninety_degrees_swaps_axes() {
        // Trace heading east: a point to the south is on the right-hand side.
        let (x, y) = Planar.angular_to_cartesian(-3.0, 4.0, 0.0, 0.0, 90.0).unwrap();
        assert!(close(x, 4.0, 1e-12), "x={x}");
        assert!(close(y, 3.0, 1e-12), "y={y}");
    }

    #[test]
    fn far_hemisphere_is_an_error() {
        let p = AzimuthalOrthographic::default();
        let err = p.angular_to_cartesian(0.0, 180.0, 0.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, RiskError::Projection(_)));
    }

    #[test]
    fn nan_input_is_an_error() {
        let p = AzimuthalOrthographic::default();
        assert!(p.angular_to_cartesian(f64::NAN, 0.0, 0.0, 0.0, 0.0).is_err());
    }
}
