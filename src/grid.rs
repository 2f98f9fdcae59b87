//! Assembly of decoded records onto a uniform scan line grid.
//!
//! Scan lines are placed on a time axis stepped by the scan period, so gaps in the
//! recording show up as rows with no data. Every swath goes to the row nearest its
//! absolute time, and values for the scan record as a whole go to the row of its
//! first placed swath. Cells with no contributing record are `None`, and become
//! [FILL_VALUE] at the output boundary.
use chrono::{DateTime, TimeZone, Utc};
use ndarray::{Array, Array1, Array2, ArrayBase, ArrayD, ArrayView1, Data, Dimension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::astronomy::{observer_look, satellite_zenith, sun_alt_az, sun_zenith};
use crate::config::DecodeConfig;
use crate::decoder::Decoded;
use crate::geoloc::{GeolocationRequest, Geolocator};
use crate::interp::linspace;
use crate::record::{Channel, OrbitDocument, ScanRecord, SwathFlags, SwathRecord};
use crate::satellite::Satellite;
use crate::timecode::{
    correct_clock_offset, unix_seconds, CLOCK_OFFSET, CLOCK_OFFSET_END, CLOCK_OFFSET_START,
};
use crate::words::Word;

/// Output value for missing cells.
pub const FILL_VALUE: f64 = -999.0;

/// Attitude values on tape are offset by this many degrees.
const ATTITUDE_OFFSET: f64 = 90.0;

/// Grid dimension of a [Variable].
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    /// One entry per scan line.
    Line,
    /// One entry per sample, up to the widest swath.
    Pixel,
    /// One entry per anchor point.
    Anchor,
}

/// Output description of a grid variable.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub name: &'static str,
    pub dims: &'static [Dim],
    pub units: Option<&'static str>,
    pub standard_name: Option<&'static str>,
}

const fn var(
    name: &'static str,
    dims: &'static [Dim],
    units: Option<&'static str>,
    standard_name: Option<&'static str>,
) -> Variable {
    Variable {
        name,
        dims,
        units,
        standard_name,
    }
}

const LINE: &[Dim] = &[Dim::Line];
const PIXELS: &[Dim] = &[Dim::Line, Dim::Pixel];
const ANCHORS: &[Dim] = &[Dim::Line, Dim::Anchor];

/// Every variable [TimeSeriesGrid::variable] can produce.
pub const VARIABLES: &[Variable] = &[
    var("time", LINE, Some("seconds"), Some("time since 1970/01/01 00:00:00")),
    var("cell_temp", LINE, Some("K"), Some("detector_cell_temperature")),
    var("electronics_temp", LINE, Some("K"), Some("electronics_temperature")),
    var("ref_temp_A", LINE, Some("K"), Some("housing_temperature")),
    var("ref_temp_B", LINE, Some("K"), Some("housing_temperature")),
    var("ref_temp_C", LINE, Some("K"), Some("housing_temperature")),
    var("ref_temp_D", LINE, Some("K"), Some("housing_temperature")),
    var("roll_error", LINE, Some("degrees"), Some("roll_axis_error")),
    var("pitch_error", LINE, Some("degrees"), Some("pitch_axis_error")),
    var("yaw_error", LINE, Some("degrees"), Some("yaw_axis_error")),
    var("height", LINE, Some("km"), Some("spacecraft_altitude")),
    var("data_population", LINE, None, Some("scanline pixel number")),
    var("subsat_lat", LINE, Some("degrees_north"), Some("latitude")),
    var("subsat_lon", LINE, Some("degrees_east"), Some("longitude")),
    var("flag_1", LINE, None, Some("summary flag: at least one other flag is on")),
    var(
        "flag_2",
        LINE,
        None,
        Some("bad consistency check between sample rate, vehicle time and ground time"),
    ),
    var("flag_3", LINE, None, Some("bad vehicle time")),
    var("flag_4", LINE, None, Some("vehicle time inserted by flywheel")),
    var("flag_5", LINE, None, Some("vehicle time carrier is absent")),
    var("flag_6", LINE, None, Some("vehicle time has skipped")),
    var("flag_8", LINE, None, Some("bad sync pulse recognition")),
    var("flag_9", LINE, None, Some("dropout of data signal")),
    var("flag_12", LINE, None, Some("bad swath size")),
    var(
        "anchor_nadang",
        ANCHORS,
        Some("degrees"),
        Some("satellite_viewing_angle_at_anchor_points"),
    ),
    var("anchor_lats", ANCHORS, Some("degrees_north"), Some("latitude_of_anchor_points")),
    var("anchor_lons", ANCHORS, Some("degrees_east"), Some("longitude_of_anchor_points")),
    var("BBT", PIXELS, Some("K"), Some("brightness_temperature")),
    var("lats_lagrange", PIXELS, Some("degrees_north"), Some("latitude from interpolation")),
    var("lons_lagrange", PIXELS, Some("degrees_east"), Some("longitude from interpolation")),
    var("lats_pyorb", PIXELS, Some("degrees_north"), Some("latitude from pyorbital")),
    var("lons_pyorb", PIXELS, Some("degrees_east"), Some("longitude from pyorbital")),
    var("solzen", PIXELS, Some("degrees"), Some("solar zenith angle")),
    var("satzen", PIXELS, Some("degrees"), Some("satellite zenith angle")),
    var("solaz", PIXELS, Some("degrees"), Some("solar azimuth angle")),
    var("sataz", PIXELS, Some("degrees"), Some("satellite azimuth angle")),
];

/// Output form of a missing-or-present value.
pub trait Fill {
    fn fill(&self) -> f64;
}

impl Fill for Option<f64> {
    fn fill(&self) -> f64 {
        self.unwrap_or(FILL_VALUE)
    }
}

impl Fill for Option<i64> {
    #[allow(clippy::cast_precision_loss)]
    fn fill(&self) -> f64 {
        self.map_or(FILL_VALUE, |v| v as f64)
    }
}

impl Fill for Option<bool> {
    fn fill(&self) -> f64 {
        self.map_or(FILL_VALUE, |v| if v { 1.0 } else { 0.0 })
    }
}

/// Replace missing values with [FILL_VALUE].
pub fn filled<S, D, T>(array: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = T>,
    D: Dimension,
    T: Fill,
{
    array.map(Fill::fill)
}

/// File level metadata from the orbit document.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GlobalAttributes {
    pub mirror_rotation: Option<f64>,
    pub sample_frequency: Word,
    pub orbit_number: Word,
    pub station_code: Word,
    pub swath_block: Word,
    pub swaths_per_record: Word,
    pub locator_number: Word,
    pub channel: Option<Channel>,
}

impl From<&OrbitDocument> for GlobalAttributes {
    fn from(orbit: &OrbitDocument) -> Self {
        GlobalAttributes {
            mirror_rotation: orbit.mirror_rate,
            sample_frequency: orbit.sample_frequency,
            orbit_number: orbit.orbit,
            station_code: orbit.station,
            swath_block: orbit.swath_block,
            swaths_per_record: orbit.swaths_per_record,
            locator_number: orbit.locators,
            channel: orbit.channel,
        }
    }
}

/// Positions from an external geolocator and the view angles derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossCheck {
    pub lats: Array2<Option<f64>>,
    pub lons: Array2<Option<f64>>,
    /// Altitude in km.
    pub alts: Array2<Option<f64>>,
    pub solar_zenith: Array2<Option<f64>>,
    pub solar_azimuth: Array2<Option<f64>>,
    pub satellite_zenith: Array2<Option<f64>>,
    pub satellite_azimuth: Array2<Option<f64>>,
}

impl CrossCheck {
    fn new(rows: usize, width: usize) -> Self {
        let empty = || Array2::from_elem((rows, width), None);
        CrossCheck {
            lats: empty(),
            lons: empty(),
            alts: empty(),
            solar_zenith: empty(),
            solar_azimuth: empty(),
            satellite_zenith: empty(),
            satellite_azimuth: empty(),
        }
    }
}

/// Decoded tape contents on a uniform scan line grid.
///
/// Pixel coordinates are geographic, i.e., latitude in `[-90, 90]` and east
/// longitude in `(-180, 180]`. Sub-satellite points and anchors keep the tape
/// convention of colatitude and west longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesGrid {
    pub attributes: GlobalAttributes,
    /// Unix seconds of each scan line.
    pub time: Array1<f64>,
    pub cell_temp: Array1<Word>,
    pub electronics_temp: Array1<Word>,
    /// Reference temperatures A through D, one column each.
    pub reference_temps: Array2<Word>,
    pub roll: Array1<Option<f64>>,
    pub pitch: Array1<Option<f64>>,
    pub yaw: Array1<Option<f64>>,
    pub height: Array1<Word>,
    pub population: Array1<Word>,
    pub subsat_lat: Array1<Option<f64>>,
    pub subsat_lon: Array1<Option<f64>>,
    /// One column per flag, in [SwathFlags::to_array] order.
    pub flags: Array2<Option<bool>>,
    pub anchor_nadir_angles: Array2<Option<f64>>,
    pub anchor_lats: Array2<Option<f64>>,
    pub anchor_lons: Array2<Option<f64>>,
    pub samples: Array2<Option<f64>>,
    pub lats: Array2<Option<f64>>,
    pub lons: Array2<Option<f64>>,
    /// Row of every swath in file order, `None` if it has no time.
    pub slots: Vec<Option<usize>>,
    pub cross_check: Option<CrossCheck>,
}

impl TimeSeriesGrid {
    fn new(attributes: GlobalAttributes, time: Array1<f64>, width: usize, locators: usize) -> Self {
        let rows = time.len();
        let pixels = || Array2::from_elem((rows, width), None);
        let anchors = || Array2::from_elem((rows, locators), None);
        TimeSeriesGrid {
            attributes,
            time,
            cell_temp: missing_line(rows),
            electronics_temp: missing_line(rows),
            reference_temps: Array2::from_elem((rows, 4), None),
            roll: missing_line(rows),
            pitch: missing_line(rows),
            yaw: missing_line(rows),
            height: missing_line(rows),
            population: missing_line(rows),
            subsat_lat: missing_line(rows),
            subsat_lon: missing_line(rows),
            flags: Array2::from_elem((rows, SwathFlags::COUNT), None),
            anchor_nadir_angles: anchors(),
            anchor_lats: anchors(),
            anchor_lons: anchors(),
            samples: pixels(),
            lats: pixels(),
            lons: pixels(),
            slots: Vec::new(),
            cross_check: None,
        }
    }

    /// Number of scan lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of pixel columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.samples.ncols()
    }

    /// The named variable from [VARIABLES] with missing values filled. Returns `None`
    /// for unknown names, and for cross-check variables if no cross-check was run.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<ArrayD<f64>> {
        let column = |k: usize| -> Option<ArrayD<f64>> {
            Some(filled(&self.flags.column(k)).into_dyn())
        };
        let refs = |k: usize| -> Option<ArrayD<f64>> {
            Some(filled(&self.reference_temps.column(k)).into_dyn())
        };
        let cross = self.cross_check.as_ref();
        match name {
            "time" => Some(self.time.clone().into_dyn()),
            "cell_temp" => Some(filled(&self.cell_temp).into_dyn()),
            "electronics_temp" => Some(filled(&self.electronics_temp).into_dyn()),
            "ref_temp_A" => refs(0),
            "ref_temp_B" => refs(1),
            "ref_temp_C" => refs(2),
            "ref_temp_D" => refs(3),
            "roll_error" => Some(filled(&self.roll).into_dyn()),
            "pitch_error" => Some(filled(&self.pitch).into_dyn()),
            "yaw_error" => Some(filled(&self.yaw).into_dyn()),
            "height" => Some(filled(&self.height).into_dyn()),
            "data_population" => Some(filled(&self.population).into_dyn()),
            "subsat_lat" => Some(filled(&self.subsat_lat).into_dyn()),
            "subsat_lon" => Some(filled(&self.subsat_lon).into_dyn()),
            "flag_1" => column(0),
            "flag_2" => column(1),
            "flag_3" => column(2),
            "flag_4" => column(3),
            "flag_5" => column(4),
            "flag_6" => column(5),
            "flag_8" => column(6),
            "flag_9" => column(7),
            "flag_12" => column(8),
            "anchor_nadang" => Some(filled(&self.anchor_nadir_angles).into_dyn()),
            "anchor_lats" => Some(filled(&self.anchor_lats).into_dyn()),
            "anchor_lons" => Some(filled(&self.anchor_lons).into_dyn()),
            "BBT" => Some(filled(&self.samples).into_dyn()),
            "lats_lagrange" => Some(filled(&self.lats).into_dyn()),
            "lons_lagrange" => Some(filled(&self.lons).into_dyn()),
            "lats_pyorb" => cross.map(|c| filled(&c.lats).into_dyn()),
            "lons_pyorb" => cross.map(|c| filled(&c.lons).into_dyn()),
            "solzen" => cross.map(|c| filled(&c.solar_zenith).into_dyn()),
            "satzen" => cross.map(|c| filled(&c.satellite_zenith).into_dyn()),
            "solaz" => cross.map(|c| filled(&c.solar_azimuth).into_dyn()),
            "sataz" => cross.map(|c| filled(&c.satellite_azimuth).into_dyn()),
            _ => None,
        }
    }

    fn put_record(&mut self, row: usize, record: &ScanRecord) {
        self.cell_temp[row] = record.cell_temp;
        self.electronics_temp[row] = record.electronics_temp;
        for (cell, temp) in self
            .reference_temps
            .row_mut(row)
            .iter_mut()
            .zip(record.reference_temps)
        {
            *cell = temp;
        }
        self.roll[row] = record.roll;
        self.pitch[row] = record.pitch;
        self.yaw[row] = record.yaw;
        self.height[row] = record.height;
    }

    fn put_swath(&mut self, row: usize, record: &ScanRecord, swath: &SwathRecord) {
        self.population[row] = i64::try_from(swath.population).ok();
        self.subsat_lat[row] = swath.subsat_lat;
        self.subsat_lon[row] = swath.subsat_lon;
        let flags = swath.flags.map(|f| f.to_array());
        put_row(
            &mut self.flags,
            row,
            (0..SwathFlags::COUNT).map(|k| flags.map(|f| f[k])),
        );
        put_row(&mut self.anchor_nadir_angles, row, record.nadir_angles.iter().copied());
        put_row(&mut self.anchor_lats, row, swath.anchor_lats.iter().copied());
        put_row(&mut self.anchor_lons, row, swath.anchor_lons.iter().copied());
        put_row(&mut self.samples, row, swath.samples.iter().copied());
        put_row(
            &mut self.lats,
            row,
            swath.lats.iter().map(|lat| lat.map(geographic_lat)),
        );
        put_row(
            &mut self.lons,
            row,
            swath.lons.iter().map(|lon| lon.map(geographic_lon)),
        );
    }
}

fn missing_line<T: Clone>(rows: usize) -> Array1<Option<T>> {
    Array1::from_elem(rows, None)
}

/// Replace a row, truncating `values` to the row length and padding with `None`.
fn put_row<T, I>(array: &mut Array2<Option<T>>, row: usize, values: I)
where
    T: Clone,
    I: IntoIterator<Item = Option<T>>,
{
    let mut dest = array.row_mut(row);
    dest.fill(None);
    for (cell, value) in dest.iter_mut().zip(values) {
        *cell = value;
    }
}

/// Latitude from tape colatitude.
#[must_use]
pub fn geographic_lat(colat: f64) -> f64 {
    colat - 90.0
}

/// East longitude in `(-180, 180]` from tape west longitude.
#[must_use]
pub fn geographic_lon(west: f64) -> f64 {
    let east = 360.0 - west;
    if east > 180.0 {
        east - 360.0
    } else {
        east
    }
}

/// Index of the value in `axis` closest to `t`, the first if there are several.
fn nearest_row(axis: &Array1<f64>, t: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in axis.iter().enumerate() {
        let dist = (value - t).abs();
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((idx, dist));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Unix seconds of a scan record's time, resolved against the orbit document start.
#[allow(clippy::cast_precision_loss)]
fn time_base(orbit: &OrbitDocument, record: &ScanRecord) -> Option<f64> {
    let start = unix_seconds(orbit.start.as_ref()?);
    let diff = |a: Word, b: Word| Some(a? - b?);
    let secs = 86_400 * diff(record.day, orbit.start_day)?
        + 3_600 * diff(record.hour, orbit.start_hour)?
        + 60 * diff(record.minute, orbit.start_minute)?
        + diff(record.second, orbit.start_second)?;
    Some(start + secs as f64)
}

/// Unix seconds of a swath, before clock offset correction.
#[allow(clippy::cast_precision_loss)]
fn swath_time(base: Option<f64>, record: &ScanRecord, swath: &SwathRecord) -> Option<f64> {
    Some(base? + swath.offset? - record.second? as f64)
}

fn is_valid(v: f64) -> Option<f64> {
    Some(v).filter(|v| v.is_finite())
}

/// Builds a [TimeSeriesGrid] from decoded tape contents.
///
/// # Example
/// ```
/// use thir::grid::TimeSeriesAssembler;
/// use thir::{DecodeConfig, Decoded, Satellite};
/// # use thir::record::OrbitDocument;
/// # use thir::words::Strategy;
/// # use thir::bytes::Span;
///
/// # let orbit = OrbitDocument::decode(Span::new(&[]), Strategy::Packed, 1970);
/// let decoded = Decoded {
///     satellite: Satellite::Nimbus4,
///     year: 1970,
///     orbit,
///     records: Vec::new(),
///     skipped: 0,
/// };
/// let config = DecodeConfig::default();
/// let grid = TimeSeriesAssembler::new(&decoded, &config).assemble();
/// assert!(grid.is_empty());
/// ```
pub struct TimeSeriesAssembler<'a> {
    decoded: &'a Decoded,
    config: &'a DecodeConfig,
}

impl<'a> TimeSeriesAssembler<'a> {
    #[must_use]
    pub fn new(decoded: &'a Decoded, config: &'a DecodeConfig) -> Self {
        TimeSeriesAssembler { decoded, config }
    }

    /// Seconds per scan line.
    #[must_use]
    pub fn scan_period(&self) -> f64 {
        self.decoded
            .orbit
            .scan_period()
            .unwrap_or(self.config.default_scan_period)
    }

    /// Place every record on the grid.
    #[must_use]
    pub fn assemble(&self) -> TimeSeriesGrid {
        let orbit = &self.decoded.orbit;
        let records = &self.decoded.records;

        let raw_times: Vec<Vec<Option<f64>>> = records
            .iter()
            .map(|record| {
                let base = time_base(orbit, record);
                record
                    .swaths
                    .iter()
                    .map(|swath| swath_time(base, record, swath))
                    .collect()
            })
            .collect();

        let time = match self.time_limits(raw_times.iter().flatten().flatten().copied()) {
            Some((t0, t1)) => self.axis(t0, t1),
            None => {
                warn!("no swath or orbit document times; grid is empty");
                Array1::zeros(0)
            }
        };
        let width = records
            .iter()
            .flat_map(|r| &r.swaths)
            .map(|s| s.population)
            .max()
            .unwrap_or(0);
        let locators = records
            .iter()
            .map(|r| r.nadir_angles.len())
            .max()
            .unwrap_or(0);
        let mut grid = TimeSeriesGrid::new(orbit.into(), time, width, locators);

        let mut dropped = 0;
        for (record, times) in records.iter().zip(&raw_times) {
            let slots: Vec<Option<usize>> = times
                .iter()
                .map(|t| t.and_then(|t| nearest_row(&grid.time, correct_clock_offset(t))))
                .collect();
            if let Some(row) = slots.iter().flatten().next() {
                grid.put_record(*row, record);
            }
            for (swath, slot) in record.swaths.iter().zip(&slots) {
                match slot {
                    Some(row) => grid.put_swath(*row, record, swath),
                    None => dropped += 1,
                }
            }
            grid.slots.extend(slots);
        }
        if dropped > 0 {
            debug!(dropped, "swaths without a time were dropped");
        }
        info!(
            rows = grid.len(),
            width = grid.width(),
            swaths = grid.slots.len(),
            "assembled grid"
        );
        grid
    }

    /// Place every record on the grid, then cross-check it against positions from
    /// `geolocator`.
    #[must_use]
    pub fn assemble_with<G>(&self, geolocator: &G) -> TimeSeriesGrid
    where
        G: Geolocator + ?Sized,
    {
        let mut grid = self.assemble();
        grid.cross_check = Some(self.cross_check(&grid, geolocator));
        grid
    }

    /// Start and end of the axis, from swath times if there are any, otherwise from the
    /// orbit document.
    fn time_limits<I>(&self, times: I) -> Option<(f64, f64)>
    where
        I: Iterator<Item = f64>,
    {
        let limits = times.fold(None, |acc: Option<(f64, f64)>, t| match acc {
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            None => Some((t, t)),
        });
        let (t0, t1) = limits.or_else(|| {
            let orbit = &self.decoded.orbit;
            let start = orbit.start.as_ref()?;
            let end = orbit.end.as_ref().unwrap_or(start);
            Some((unix_seconds(start), unix_seconds(end)))
        })?;
        if t0 > CLOCK_OFFSET_START && t1 < CLOCK_OFFSET_END {
            Some((t0 - CLOCK_OFFSET, t1 - CLOCK_OFFSET))
        } else {
            Some((t0, t1))
        }
    }

    /// Scan line times from `t0` through `t1`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn axis(&self, t0: f64, t1: f64) -> Array1<f64> {
        let sep = self.scan_period();
        let lines = (t1 + sep - t0) / sep;
        let mut rows = if lines.is_finite() && lines > 0.0 {
            lines.ceil() as usize
        } else {
            0
        };
        if rows > self.config.max_scan_lines {
            warn!(
                rows,
                max = self.config.max_scan_lines,
                "time range is implausibly long; truncating grid"
            );
            rows = self.config.max_scan_lines;
        }
        Array1::from_iter((0..rows).map(|i| t0 + i as f64 * sep))
    }

    /// Locate every scan line with `geolocator`, carrying attitude, anchors, width and
    /// height forward from the latest line that has them.
    fn cross_check<G>(&self, grid: &TimeSeriesGrid, geolocator: &G) -> CrossCheck
    where
        G: Geolocator + ?Sized,
    {
        let mut check = CrossCheck::new(grid.len(), grid.width());
        let mut carried = Carried::seed(grid);
        let scan_period = self.scan_period();

        for row in 0..grid.len() {
            carried.update(grid, row);
            let Some(request) = carried.request(grid.time[row], self.decoded.satellite, scan_period)
            else {
                debug!(row, "no attitude, anchors or population known; skipping line");
                continue;
            };
            let geolocation = match geolocator.estimate_geolocation(&request) {
                Ok(geolocation) => geolocation,
                Err(err) => {
                    warn!(row, epoch = request.epoch, %err, "geolocation failed");
                    continue;
                }
            };

            let width = grid.width().min(geolocation.len());
            let valid = |values: &[f64]| -> Vec<Option<f64>> {
                values.iter().take(width).map(|v| is_valid(*v)).collect()
            };
            let lons = valid(&geolocation.lon);
            let lats = valid(&geolocation.lat);
            let alts = valid(&geolocation.alt);
            put_row(&mut check.lons, row, lons.iter().copied());
            put_row(&mut check.lats, row, lats.iter().copied());
            put_row(&mut check.alts, row, alts.iter().copied());

            #[allow(clippy::cast_possible_truncation)]
            let millis = (grid.time[row] * 1000.0).round() as i64;
            let Some(t) = Utc.timestamp_millis_opt(millis).single() else {
                continue;
            };
            let angles = ViewAngles::new(&t, &request, &lons, &lats, &alts);
            put_row(&mut check.solar_zenith, row, angles.solar_zenith);
            put_row(&mut check.solar_azimuth, row, angles.solar_azimuth);
            put_row(&mut check.satellite_zenith, row, angles.satellite_zenith);
            put_row(&mut check.satellite_azimuth, row, angles.satellite_azimuth);
        }
        check
    }
}

/// Latest known per-line values during the cross-check pass.
struct Carried {
    roll: Option<f64>,
    pitch: Option<f64>,
    yaw: Option<f64>,
    nadir_angles: Option<Vec<f64>>,
    population: Option<usize>,
    height: Option<f64>,
}

fn all_valid(values: ArrayView1<'_, Option<f64>>) -> Option<Vec<f64>> {
    if values.is_empty() {
        return None;
    }
    values.iter().copied().collect()
}

fn positive_population(word: Word) -> Option<usize> {
    word.filter(|p| *p > 0).and_then(|p| usize::try_from(p).ok())
}

impl Carried {
    /// Initial values from the first placed swath, in file order, that has each.
    #[allow(clippy::cast_precision_loss)]
    fn seed(grid: &TimeSeriesGrid) -> Self {
        let rows = || grid.slots.iter().flatten().copied();
        Carried {
            roll: rows().find_map(|r| grid.roll[r]),
            pitch: rows().find_map(|r| grid.pitch[r]),
            yaw: rows().find_map(|r| grid.yaw[r]),
            nadir_angles: rows().find_map(|r| all_valid(grid.anchor_nadir_angles.row(r))),
            population: rows().find_map(|r| positive_population(grid.population[r])),
            height: rows().find_map(|r| grid.height[r].map(|h| h as f64)),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn update(&mut self, grid: &TimeSeriesGrid, row: usize) {
        self.roll = grid.roll[row].or(self.roll);
        self.pitch = grid.pitch[row].or(self.pitch);
        self.yaw = grid.yaw[row].or(self.yaw);
        if let Some(nadirs) = all_valid(grid.anchor_nadir_angles.row(row)) {
            self.nadir_angles = Some(nadirs);
        }
        self.population = positive_population(grid.population[row]).or(self.population);
        self.height = grid.height[row].map(|h| h as f64).or(self.height);
    }

    fn request(
        &self,
        epoch: f64,
        satellite: Satellite,
        scan_period: f64,
    ) -> Option<GeolocationRequest> {
        Some(GeolocationRequest {
            epoch,
            population: self.population?,
            nadir_angles: self.nadir_angles.clone()?,
            roll: self.roll? - ATTITUDE_OFFSET,
            pitch: self.pitch? - ATTITUDE_OFFSET,
            yaw: self.yaw? - ATTITUDE_OFFSET,
            height: self.height,
            satellite,
            scan_period,
        })
    }
}

/// Solar and satellite angles for each pixel of one scan line.
struct ViewAngles {
    solar_zenith: Vec<Option<f64>>,
    solar_azimuth: Vec<Option<f64>>,
    satellite_zenith: Vec<Option<f64>>,
    satellite_azimuth: Vec<Option<f64>>,
}

impl ViewAngles {
    fn new(
        t: &DateTime<Utc>,
        request: &GeolocationRequest,
        lons: &[Option<f64>],
        lats: &[Option<f64>],
        alts: &[Option<f64>],
    ) -> Self {
        let (first, last) = match (request.nadir_angles.first(), request.nadir_angles.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (0.0, 0.0),
        };
        let view_angles = linspace(last, first, request.population);
        let position = |j: usize| -> Option<(f64, f64, f64)> {
            Some((
                (*lons.get(j)?)?,
                (*lats.get(j)?)?,
                (*alts.get(j)?)?,
            ))
        };
        let center = position(request.population / 2);

        let mut angles = ViewAngles {
            solar_zenith: Vec::with_capacity(lons.len()),
            solar_azimuth: Vec::with_capacity(lons.len()),
            satellite_zenith: Vec::with_capacity(lons.len()),
            satellite_azimuth: Vec::with_capacity(lons.len()),
        };
        for j in 0..lons.len() {
            let Some((lon, lat, alt)) = position(j) else {
                angles.solar_zenith.push(None);
                angles.solar_azimuth.push(None);
                angles.satellite_zenith.push(None);
                angles.satellite_azimuth.push(None);
                continue;
            };
            angles.solar_zenith.push(is_valid(sun_zenith(t, lon, lat)));
            angles
                .solar_azimuth
                .push(is_valid(sun_alt_az(t, lon, lat).1.to_degrees()));
            let (zenith, azimuth) = match (center, view_angles.get(j)) {
                (Some((clon, clat, calt)), Some(view)) => (
                    is_valid(satellite_zenith(*view, clat, clon, lat, lon)),
                    is_valid(observer_look(t, (clon, clat, calt), (lon, lat, alt)).0),
                ),
                _ => (None, None),
            };
            angles.satellite_zenith.push(zenith);
            angles.satellite_azimuth.push(azimuth);
        }
        angles
    }
}
