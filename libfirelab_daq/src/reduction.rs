//! Conversion of raw test data to engineering units.
//!
//! The reduction channel list describes how each recorded channel is converted:
//!
//! ```csv
//! Channel_Name,Type,Scale,Offset,Chart,Label
//! TC_A1,Temperature,,,Temperature_A,TC A1
//! BDP1,Velocity,1.0,0,Velocity,Probe 1
//! BTC1,Temperature,,,Probe_Temperature,Probe 1 TC
//! O2_1,Oxygen,6.25,0,Front_Gas,O2
//! ```
//!
//! Gas analysers see the fire with a delay. The optional test description gives that lag (in
//! seconds) per test and per gas chart group:
//!
//! ```csv
//! Test,Front_Gas
//! Test_12,25
//! ```
use fxhash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::config::ReductionConfig;
use super::error::ReductionError;
use super::filters::{centered_moving_average, mean, round3, savgol_filter};
use super::test_data::{TestData, EVENT_COLUMN};

const GAS_GROUP_SUFFIX: &str = "_Gas";
const PITOT_COEFFICIENT: f64 = 0.0698;
const KELVIN_OFFSET: f64 = 273.15;
const MPH_PER_MPS: f64 = 2.23694;
/// Ambient oxygen fraction (% vol) and analyser span used to zero 1-5 V oxygen channels
const AMBIENT_OXYGEN: f64 = 20.98;
const OXYGEN_SPAN: f64 = 25.0;

/// A second unit for a chart axis: `value * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryAxis {
    pub label: &'static str,
    pub scale: f64,
    pub offset: f64,
}

impl SecondaryAxis {
    pub fn convert(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

/// How a channel is converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    Temperature,
    Velocity,
    DifferentialPressure,
    HeatFlux,
    Oxygen,
    CarbonMonoxide,
    CarbonDioxide,
}

impl MeasurementKind {
    /// Axis label of the kind's engineering unit
    pub fn axis_label(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature (°C)",
            Self::Velocity => "Velocity (m/s)",
            Self::DifferentialPressure => "Pressure (Pa)",
            Self::HeatFlux => "Heat Flux (kW/m²)",
            Self::Oxygen | Self::CarbonMonoxide | Self::CarbonDioxide => "Concentration (% vol)",
        }
    }

    /// The imperial axis drawn next to the SI one, for kinds that have one
    pub fn secondary_axis(&self) -> Option<SecondaryAxis> {
        match self {
            Self::Temperature => Some(SecondaryAxis {
                label: "Temperature (°F)",
                scale: 1.8,
                offset: 32.0,
            }),
            Self::Velocity => Some(SecondaryAxis {
                label: "Velocity (mph)",
                scale: MPH_PER_MPS,
                offset: 0.0,
            }),
            _ => None,
        }
    }
}

impl FromStr for MeasurementKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Temperature" => Ok(Self::Temperature),
            "Velocity" => Ok(Self::Velocity),
            "Differential Pressure" => Ok(Self::DifferentialPressure),
            "Heat Flux" | "Radiant Heat Flux" => Ok(Self::HeatFlux),
            "Oxygen" => Ok(Self::Oxygen),
            "Carbon Monoxide" => Ok(Self::CarbonMonoxide),
            "Carbon Dioxide" => Ok(Self::CarbonDioxide),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ReductionRow {
    #[serde(rename = "Channel_Name")]
    channel_name: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Scale")]
    scale: Option<f64>,
    #[serde(rename = "Offset")]
    offset: Option<f64>,
    #[serde(rename = "Chart")]
    chart: String,
    #[serde(rename = "Label")]
    label: String,
}

/// A channel of the reduction channel list
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionChannel {
    pub name: String,
    pub kind: MeasurementKind,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub chart: String,
    pub label: String,
}

impl ReductionChannel {
    fn scale(&self) -> Result<f64, ReductionError> {
        self.scale.ok_or_else(|| self.missing("Scale"))
    }

    fn offset(&self) -> Result<f64, ReductionError> {
        self.offset.ok_or_else(|| self.missing("Offset"))
    }

    fn missing(&self, parameter: &'static str) -> ReductionError {
        ReductionError::MissingParameter {
            channel: self.name.clone(),
            kind: format!("{:?}", self.kind),
            parameter,
        }
    }
}

/// The thermocouple recorded next to a velocity probe: `BDP1` pairs with `BTC1`
pub fn paired_temperature_channel(name: &str) -> String {
    let first: String = name.chars().take(1).collect();
    let rest: String = name.chars().skip(3).collect();
    format!("{first}TC{rest}")
}

/// Read the reduction channel list
pub fn read_reduction_channels(path: &Path) -> Result<Vec<ReductionChannel>, ReductionError> {
    let csv_error = |e: csv::Error| ReductionError::Csv {
        path: PathBuf::from(path),
        source: e,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let mut channels = Vec::new();
    for result in rdr.deserialize::<ReductionRow>() {
        let row = result.map_err(csv_error)?;
        let kind = MeasurementKind::from_str(&row.kind).map_err(|kind| {
            ReductionError::UnknownType {
                channel: row.channel_name.clone(),
                kind,
            }
        })?;
        channels.push(ReductionChannel {
            name: row.channel_name,
            kind,
            scale: row.scale,
            offset: row.offset,
            chart: row.chart,
            label: row.label,
        });
    }
    Ok(channels)
}

/// Gas analyser lag times, test -> chart group -> seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LagTable {
    lags: FxHashMap<String, FxHashMap<String, f64>>,
}

impl LagTable {
    /// Read the lag columns (`*_Gas`) of a test description
    pub fn read(path: &Path) -> Result<Self, ReductionError> {
        let csv_error = |e: csv::Error| ReductionError::Csv {
            path: PathBuf::from(path),
            source: e,
        };
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let test_idx = headers.iter().position(|h| h == "Test").unwrap_or(0);

        let mut table = Self::default();
        for result in rdr.records() {
            let record = result.map_err(csv_error)?;
            let test = record.get(test_idx).unwrap_or_default().to_string();
            let mut groups = FxHashMap::default();
            for (idx, group) in headers.iter().enumerate() {
                if !group.ends_with(GAS_GROUP_SUFFIX) {
                    continue;
                }
                let value = record.get(idx).unwrap_or_default();
                if value.is_empty() {
                    continue;
                }
                let lag = value.parse::<f64>().map_err(|_| ReductionError::BadLagTime {
                    path: path.to_path_buf(),
                    test: test.clone(),
                    group: group.to_string(),
                    value: value.to_string(),
                })?;
                groups.insert(group.to_string(), lag);
            }
            table.lags.insert(test, groups);
        }
        Ok(table)
    }

    /// Lag for a test and chart group; zero if not listed
    pub fn lag(&self, test: &str, group: &str) -> f64 {
        self.lags
            .get(test)
            .and_then(|g| g.get(group))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn insert(&mut self, test: &str, group: &str, lag: f64) {
        self.lags
            .entry(test.to_string())
            .or_default()
            .insert(group.to_string(), lag);
    }
}

/// One converted channel. Only samples at or after ignition are kept
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedSeries {
    pub channel: String,
    pub label: String,
    pub chart: String,
    pub kind: MeasurementKind,
    pub points: Vec<(i64, f64)>,
}

/// Summary of a converted channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    pub channel: String,
    pub label: String,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
}

impl ReducedSeries {
    pub fn stats(&self) -> Option<ChannelStats> {
        let values = self.points.iter().map(|(_, v)| *v);
        let max = values.clone().fold(f64::NAN, f64::max);
        let min = values.clone().fold(f64::NAN, f64::min);
        let mean = mean(values)?;
        Some(ChannelStats {
            channel: self.channel.clone(),
            label: self.label.clone(),
            max: round3(max),
            min: round3(min),
            mean: round3(mean),
        })
    }
}

/// All converted channels of a test
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedTest {
    pub test_name: String,
    pub series: Vec<ReducedSeries>,
    /// Events at or after ignition, in time order
    pub events: Vec<(i64, String)>,
}

impl ReducedTest {
    /// Events grouped by time; events in the same second are joined with `; `
    fn events_by_time(&self) -> BTreeMap<i64, String> {
        let mut events: BTreeMap<i64, String> = BTreeMap::new();
        for (t, event) in self.events.iter() {
            let entry = events.entry(*t).or_default();
            if !entry.is_empty() {
                entry.push_str("; ");
            }
            entry.push_str(event);
        }
        events
    }

    /// Write one row per time with a column per channel and a final `Event` column. Gaps are
    /// left blank
    pub fn write_reduced_csv<W: Write>(&self, writer: W) -> Result<(), ReductionError> {
        let mut rows: BTreeMap<i64, Vec<Option<f64>>> = BTreeMap::new();
        for (idx, series) in self.series.iter().enumerate() {
            for (t, v) in series.points.iter() {
                rows.entry(*t).or_insert_with(|| vec![None; self.series.len()])[idx] = Some(*v);
            }
        }
        let mut events = self.events_by_time();
        for t in events.keys() {
            rows.entry(*t)
                .or_insert_with(|| vec![None; self.series.len()]);
        }

        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec![String::from("Time")];
        header.extend(self.series.iter().map(|s| s.channel.clone()));
        header.push(String::from(EVENT_COLUMN));
        wtr.write_record(&header)?;
        for (t, values) in rows {
            let mut record = vec![t.to_string()];
            record.extend(
                values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            record.push(events.remove(&t).unwrap_or_default());
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn stats(&self) -> Vec<ChannelStats> {
        self.series.iter().filter_map(|s| s.stats()).collect()
    }

    /// Write one row per channel. Channels without data after ignition get blank values
    pub fn write_stats_csv<W: Write>(&self, writer: W) -> Result<(), ReductionError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["Channel", "Label", "Max", "Min", "Mean"])?;
        for series in self.series.iter() {
            match series.stats() {
                Some(stat) => wtr.write_record([
                    stat.channel,
                    stat.label,
                    stat.max.to_string(),
                    stat.min.to_string(),
                    stat.mean.to_string(),
                ])?,
                None => {
                    log::warn!(
                        "Test {}: channel {} has no data after ignition",
                        self.test_name,
                        series.channel
                    );
                    wtr.write_record([series.channel.as_str(), series.label.as_str(), "", "", ""])?
                }
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Converts test data using a reduction channel list
#[derive(Debug, Clone)]
pub struct Reducer {
    channels: Vec<ReductionChannel>,
    lags: LagTable,
    moving_average_window: usize,
    savgol_window: usize,
    savgol_order: usize,
}

impl Reducer {
    pub fn new(
        channels: Vec<ReductionChannel>,
        lags: LagTable,
        moving_average_window: usize,
        savgol_window: usize,
        savgol_order: usize,
    ) -> Self {
        Self {
            channels,
            lags,
            moving_average_window,
            savgol_window,
            savgol_order,
        }
    }

    /// Load the channel list and test description named in the config
    pub fn from_config(config: &ReductionConfig) -> Result<Self, ReductionError> {
        let channels = read_reduction_channels(&config.channel_list)?;
        let lags = match &config.test_description {
            Some(path) => LagTable::read(path)?,
            None => LagTable::default(),
        };
        Ok(Self::new(
            channels,
            lags,
            config.moving_average_window,
            config.savgol_window,
            config.savgol_order,
        ))
    }

    pub fn channels(&self) -> &[ReductionChannel] {
        &self.channels
    }

    pub fn reduce(&self, data: &TestData) -> Result<ReducedTest, ReductionError> {
        let mut series = Vec::with_capacity(self.channels.len());
        for channel in self.channels.iter() {
            let values = self.convert(channel, data)?;
            let points = data
                .time
                .iter()
                .zip(values)
                .filter_map(|(t, v)| v.filter(|_| *t >= 0).map(|v| (*t, v)))
                .collect();
            series.push(ReducedSeries {
                channel: channel.name.clone(),
                label: channel.label.clone(),
                chart: channel.chart.clone(),
                kind: channel.kind,
                points,
            });
        }
        let events = data
            .event_times()
            .filter(|(t, _)| *t >= 0)
            .map(|(t, e)| (t, e.to_string()))
            .collect();
        Ok(ReducedTest {
            test_name: data.test_name.clone(),
            series,
            events,
        })
    }

    fn column<'a>(
        &self,
        data: &'a TestData,
        name: &str,
    ) -> Result<&'a [Option<f64>], ReductionError> {
        data.column(name).ok_or_else(|| ReductionError::MissingChannel {
            test: data.test_name.clone(),
            channel: name.to_string(),
        })
    }

    /// Convert a channel over the full test, before and after ignition
    fn convert(
        &self,
        channel: &ReductionChannel,
        data: &TestData,
    ) -> Result<Vec<Option<f64>>, ReductionError> {
        let raw = self.column(data, &channel.name)?;
        let converted = match channel.kind {
            MeasurementKind::Temperature => {
                centered_moving_average(raw, self.moving_average_window)
            }
            MeasurementKind::Velocity => {
                let scale = channel.scale()?;
                let temperature = self.column(data, &paired_temperature_channel(&channel.name))?;
                let baseline = baseline(channel, &data.time, raw, 0.0)?;
                let velocity: Vec<Option<f64>> = raw
                    .iter()
                    .zip(temperature)
                    .map(|(x, t)| {
                        let zeroed = (*x)? - baseline;
                        let t = (*t)?;
                        Some(
                            zeroed.signum()
                                * PITOT_COEFFICIENT
                                * ((t + KELVIN_OFFSET) * (scale * zeroed.abs())).sqrt(),
                        )
                    })
                    .collect();
                self.smooth(channel, &data.time, velocity)
            }
            MeasurementKind::DifferentialPressure => {
                let scale = channel.scale()?;
                let offset = channel.offset()?;
                let pressure: Vec<Option<f64>> =
                    raw.iter().map(|x| x.map(|x| scale * x + offset)).collect();
                let baseline = baseline(channel, &data.time, &pressure, 0.0)?;
                let zeroed = pressure.iter().map(|p| p.map(|p| p - baseline)).collect();
                self.smooth(channel, &data.time, zeroed)
            }
            MeasurementKind::HeatFlux => {
                let scale = channel.scale()?;
                let baseline = baseline(channel, &data.time, raw, 0.0)?;
                let flux = raw
                    .iter()
                    .map(|x| x.map(|x| (x - baseline) * scale))
                    .collect();
                self.smooth(channel, &data.time, flux)
            }
            MeasurementKind::Oxygen
            | MeasurementKind::CarbonMonoxide
            | MeasurementKind::CarbonDioxide => {
                let scale = channel.scale()?;
                let offset = channel.offset()?;
                let lag = self.lags.lag(&data.test_name, &channel.chart);
                let background = baseline(channel, &data.time, raw, lag)?;
                let zero = if channel.kind == MeasurementKind::Oxygen {
                    // 1-5 V analyser: the background reads ambient oxygen, not zero
                    background - 4.0 * (AMBIENT_OXYGEN / OXYGEN_SPAN)
                } else {
                    background
                };
                let concentration: Vec<Option<f64>> = raw
                    .iter()
                    .map(|x| x.map(|x| scale * (x - zero) + offset))
                    .collect();
                centered_moving_average(&concentration, self.moving_average_window)
            }
        };
        Ok(converted)
    }

    /// Savitzky-Golay over the defined samples from ignition on, so the fit at the start of
    /// the test never sees pre-ignition data. Samples before ignition come back as None.
    /// Channels too short for the window are passed through unfiltered
    fn smooth(
        &self,
        channel: &ReductionChannel,
        time: &[i64],
        data: Vec<Option<f64>>,
    ) -> Vec<Option<f64>> {
        let data: Vec<Option<f64>> = time
            .iter()
            .zip(data)
            .map(|(t, v)| v.filter(|_| *t >= 0))
            .collect();
        let defined: Vec<f64> = data.iter().flatten().copied().collect();
        match savgol_filter(&defined, self.savgol_window, self.savgol_order) {
            Some(filtered) => {
                let mut filtered = filtered.into_iter();
                data.iter()
                    .map(|v| v.and_then(|_| filtered.next()))
                    .collect()
            }
            None => {
                log::warn!(
                    "Channel {} has {} samples, too few for a {} point filter; writing it unfiltered",
                    channel.name,
                    defined.len(),
                    self.savgol_window
                );
                data
            }
        }
    }
}

/// Mean of the samples up to one second before `before`, the background to zero against
fn baseline(
    channel: &ReductionChannel,
    time: &[i64],
    data: &[Option<f64>],
    before: f64,
) -> Result<f64, ReductionError> {
    mean(
        time.iter()
            .zip(data)
            .filter(|(t, _)| (**t as f64) <= before - 1.0)
            .filter_map(|(_, v)| *v),
    )
    .ok_or_else(|| ReductionError::NoBaseline {
        channel: channel.name.clone(),
        before,
    })
}
