//! Solar position and viewing geometry.
//!
//! The solar position comes from the VSOP87 ephemeris and the hour angle from
//! Greenwich mean sidereal time, both provided by the `astro` crate. Positions on the
//! earth use the WGS84 ellipsoid.
use std::f64::consts::{PI, TAU};

use astro::{coords, ecliptic, sun, time};
use chrono::{DateTime, Utc};

/// WGS84 equatorial radius in km.
pub const EARTH_RADIUS: f64 = 6378.137;
/// WGS84 flattening.
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Julian day of the Unix epoch, 1970-01-01T00:00:00Z.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian day of `t`.
#[must_use]
pub fn julian_day(t: &DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let days = t.timestamp_millis() as f64 / 86_400_000.0;
    UNIX_EPOCH_JD + days
}

/// Right ascension and declination of the sun in radians.
#[must_use]
pub fn sun_ra_dec(t: &DateTime<Utc>) -> (f64, f64) {
    let jd = julian_day(t);
    let (ecl, _) = sun::geocent_ecl_pos(jd);
    let obliquity = ecliptic::mn_oblq_IAU(jd);
    (
        coords::asc_frm_ecl(ecl.long, ecl.lat, obliquity),
        coords::dec_frm_ecl(ecl.long, ecl.lat, obliquity),
    )
}

/// Greenwich mean sidereal time in radians, in `[0, 2π)`.
#[must_use]
pub fn gmst(t: &DateTime<Utc>) -> f64 {
    time::mn_sidr(julian_day(t)).rem_euclid(TAU)
}

fn local_hour_angle(t: &DateTime<Utc>, lon: f64, right_ascension: f64) -> f64 {
    gmst(t) + lon - right_ascension
}

/// Solar altitude and azimuth in radians at geographic `lon`, `lat` in degrees.
///
/// Azimuth is measured from south, positive westward, as returned by the hour angle
/// formulation.
#[must_use]
pub fn sun_alt_az(t: &DateTime<Utc>, lon: f64, lat: f64) -> (f64, f64) {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    let (ra, dec) = sun_ra_dec(t);
    let h = local_hour_angle(t, lon, ra);
    let alt = (lat.sin() * dec.sin() + lat.cos() * dec.cos() * h.cos()).asin();
    let az = (-h.sin()).atan2(lat.cos() * dec.tan() - lat.sin() * h.cos());
    (alt, az)
}

/// Cosine of the solar zenith angle at geographic `lon`, `lat` in degrees.
#[must_use]
pub fn cos_zenith(t: &DateTime<Utc>, lon: f64, lat: f64) -> f64 {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    let (ra, dec) = sun_ra_dec(t);
    let h = local_hour_angle(t, lon, ra);
    lat.sin() * dec.sin() + lat.cos() * dec.cos() * h.cos()
}

/// Solar zenith angle in degrees at geographic `lon`, `lat` in degrees.
#[must_use]
pub fn sun_zenith(t: &DateTime<Utc>, lon: f64, lat: f64) -> f64 {
    cos_zenith(t, lon, lat).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Earth centred inertial position in km of a point at geographic `lon`, `lat` in
/// degrees and `alt` km above the ellipsoid.
#[must_use]
pub fn observer_position(t: &DateTime<Utc>, lon: f64, lat: f64, alt: f64) -> [f64; 3] {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    let theta = (gmst(t) + lon).rem_euclid(TAU);
    let c = 1.0 / (1.0 + FLATTENING * (FLATTENING - 2.0) * lat.sin().powi(2)).sqrt();
    let sq = c * (1.0 - FLATTENING).powi(2);
    let achcp = (EARTH_RADIUS * c + alt) * lat.cos();
    [
        achcp * theta.cos(),
        achcp * theta.sin(),
        (EARTH_RADIUS * sq + alt) * lat.sin(),
    ]
}

/// Azimuth and elevation in degrees of a target at (`target_lon`, `target_lat`,
/// `target_alt`) as seen from an observer at (`lon`, `lat`, `alt`).
///
/// Azimuth is clockwise from north in `[0, 360)`.
#[must_use]
pub fn observer_look(
    t: &DateTime<Utc>,
    target: (f64, f64, f64),
    observer: (f64, f64, f64),
) -> (f64, f64) {
    let (target_lon, target_lat, target_alt) = target;
    let (lon, lat, alt) = observer;
    let pos = observer_position(t, target_lon, target_lat, target_alt);
    let opos = observer_position(t, lon, lat, alt);
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    let theta = (gmst(t) + lon).rem_euclid(TAU);

    let [rx, ry, rz] = [pos[0] - opos[0], pos[1] - opos[1], pos[2] - opos[2]];
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();

    let top_s = sin_lat * cos_theta * rx + sin_lat * sin_theta * ry - cos_lat * rz;
    let top_e = -sin_theta * rx + cos_theta * ry;
    let top_z = cos_lat * cos_theta * rx + cos_lat * sin_theta * ry + sin_lat * rz;

    let mut az = (-top_e / top_s).atan();
    if top_s > 0.0 {
        az += PI;
    }
    if az < 0.0 {
        az += TAU;
    }
    let range = (rx * rx + ry * ry + rz * rz).sqrt();
    let el = (top_z / range).asin();
    (az.to_degrees(), el.to_degrees())
}

/// Central angle in radians between two points, by the haversine law.
#[must_use]
pub fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let h = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Satellite zenith angle at a point viewed at `view_angle` degrees from nadir by a
/// satellite above (`sub_lat`, `sub_lon`).
///
/// This is the view angle magnitude plus the central angle between the points, with
/// the central angle left in radians. The result is therefore only an approximation
/// close to nadir.
#[must_use]
pub fn satellite_zenith(view_angle: f64, sub_lat: f64, sub_lon: f64, lat: f64, lon: f64) -> f64 {
    view_angle.abs() + central_angle(sub_lat, sub_lon, lat, lon)
}
