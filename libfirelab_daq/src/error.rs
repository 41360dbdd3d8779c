use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("No panels are defined in the panel layout")]
    NoPanels,
    #[error("The system ID of the panel layout is empty")]
    EmptySystemId,
    #[error("Panel {0} is defined in panel_defs but has no channel range in panel_chans")]
    MissingRange(u32),
    #[error("Panel {0} has a channel range in panel_chans but is not defined in panel_defs")]
    MissingDefinition(u32),
    #[error("Panel {panel} has an invalid channel range [{start}, {end})")]
    BadRange { panel: u32, start: u32, end: u32 },
    #[error("Panels {first} and {second} claim overlapping channels on slot {slot}")]
    OverlappingChannels { first: u32, second: u32, slot: u32 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has an invalid panel layout: {0}")]
    LayoutError(#[from] LayoutError),
}

#[derive(Debug, Error)]
pub enum ChannelListError {
    #[error("Could not read channel list {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Channel list {path:?} is missing the required column {column}")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Channel list {path:?} line {line}: panel {panel} is not defined in the panel layout")]
    UnknownPanel { path: PathBuf, line: u64, panel: u32 },
    #[error("Channel list {path:?} line {line}: channel {channel} is out of range for panel {panel} which has {width} channels")]
    ChannelOutOfRange {
        path: PathBuf,
        line: u64,
        panel: u32,
        channel: u32,
        width: u32,
    },
    #[error("Channel list {path:?} line {line}: channel name {name} was already used on line {first_line}")]
    DuplicateName {
        path: PathBuf,
        line: u64,
        name: String,
        first_line: u64,
    },
    #[error("Channel list {path:?} line {line}: panel {panel} channel {channel} is already assigned to {existing}")]
    DuplicateSlot {
        path: PathBuf,
        line: u64,
        panel: u32,
        channel: u32,
        existing: String,
    },
}

#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("Channel config emitter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum HardwareConfigError {
    #[error("Hardware config emitter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Hardware config emitter was given a device with an empty name")]
    EmptyDeviceName,
}

#[derive(Debug, Error)]
pub enum TestDataError {
    #[error("TestData failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not parse test data file {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Test data file {path:?} is missing the required column {column}")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Test data file {path:?} line {line}: could not parse timestamp {value:?}")]
    BadTimestamp {
        path: PathBuf,
        line: u64,
        value: String,
    },
    #[error("Test data file {path:?} line {line}: could not parse value {value:?} in column {column}")]
    BadValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
    #[error("Test data file {0:?} does not contain an Ignition event")]
    NoIgnition(PathBuf),
}

#[derive(Debug, Error)]
pub enum ReductionError {
    #[error("Reduction failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Reduction failed to parse {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Reduction failed to write csv output: {0}")]
    CsvWriteError(#[from] csv::Error),
    #[error("Reduction failed due to test data error: {0}")]
    TestDataError(#[from] TestDataError),
    #[error("Data type {kind} for channel {channel} is not supported")]
    UnknownType { channel: String, kind: String },
    #[error("Channel {channel} of type {kind} requires a {parameter} in the channel list")]
    MissingParameter {
        channel: String,
        kind: String,
        parameter: &'static str,
    },
    #[error("Test {test} has no data column for channel {channel}")]
    MissingChannel { test: String, channel: String },
    #[error("Channel {channel} has no data before time {before} to zero against")]
    NoBaseline { channel: String, before: f64 },
    #[error("Could not draw chart {chart}: {message}")]
    ChartError { chart: String, message: String },
    #[error("Test description {path:?} has an invalid lag time {value:?} for test {test} group {group}")]
    BadLagTime {
        path: PathBuf,
        test: String,
        group: String,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to panel layout error: {0}")]
    LayoutError(#[from] LayoutError),
    #[error("Processor failed due to channel list error: {0}")]
    ChannelListError(#[from] ChannelListError),
    #[error("Processor failed due to channel config emitter error: {0}")]
    EmitterError(#[from] EmitterError),
    #[error("Processor failed due to hardware config error: {0}")]
    HardwareConfigError(#[from] HardwareConfigError),
    #[error("Processor failed due to reduction error: {0}")]
    ReductionError(#[from] ReductionError),
    #[error("Processor failed because the configuration has no reduction section")]
    NoReductionConfig,
    #[error("Processor failed because directory {0:?} does not exist")]
    BadDirectory(PathBuf),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
