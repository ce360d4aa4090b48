use super::super::domain::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points using the haversine formula.
pub fn distance_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlng = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (dlng / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
