//! Sensor types and the fixed per-type parameter tables.
//!
//! Every sensor type string found in a channel list (or used as a panel default) resolves to
//! a [`SensorType`]. The type selects two static tables:
//!
//! - [`ChannelParams`]: the function, units, alarm limits and range written into a `.chcfg`
//!   channel block.
//! - [`DaqmxProfile`]: the `[DAQmxChannel]` column layout and values written into the
//!   hardware configuration file.
//!
//! Any unrecognized type string resolves to [`SensorType::Voltage`], the generic +/-10 V
//! analog input. Adding a sensor type means adding a row to [`SENSOR_NAMES`] and a parameter
//! entry, nothing else.
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SensorType {
    Temperature,
    HeatFlux,
    WindDirection,
    WindVelocity,
    Oxygen,
    CarbonMonoxide,
    CarbonDioxide,
    #[default]
    Voltage,
}

/// Names as they appear in channel lists
const SENSOR_NAMES: [(&str, SensorType); 8] = [
    ("Temperature", SensorType::Temperature),
    ("Heat_Flux", SensorType::HeatFlux),
    ("Wind_Direction", SensorType::WindDirection),
    ("Wind_Velo", SensorType::WindVelocity),
    ("Oxygen", SensorType::Oxygen),
    ("Carbon_Monoxide", SensorType::CarbonMonoxide),
    ("Carbon_Dioxide", SensorType::CarbonDioxide),
    ("Voltage", SensorType::Voltage),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmMode {
    HighAndLow,
    HighOnly,
}

impl AlarmMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighAndLow => "High and Low",
            Self::HighOnly => "High Only",
        }
    }
}

/// Channel block values for a sensor type. The strings are written verbatim (inside quotes),
/// so their precision is part of the file format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelParams {
    pub function: &'static str,
    pub units: &'static str,
    pub low_limit: &'static str,
    pub high_limit: &'static str,
    pub min: &'static str,
    pub max: &'static str,
    pub alarm: AlarmMode,
}

const THERMOCOUPLE_PARAMS: ChannelParams = ChannelParams {
    function: "Thermocouple (K)",
    units: "C",
    low_limit: "-17.777800",
    high_limit: "1230.00000",
    min: "-245.729755",
    max: "1232.065825",
    alarm: AlarmMode::HighAndLow,
};

const HEAT_FLUX_PARAMS: ChannelParams = ChannelParams {
    function: "Voltage",
    units: "V",
    low_limit: "-0.099000",
    high_limit: "0.099000",
    min: "-0.100000",
    max: "0.100000",
    alarm: AlarmMode::HighAndLow,
};

const WIND_PARAMS: ChannelParams = ChannelParams {
    function: "Voltage",
    units: "V",
    low_limit: "-0.099000",
    high_limit: "9.999000",
    min: "-10.00000",
    max: "10.00000",
    alarm: AlarmMode::HighAndLow,
};

const GAS_PARAMS: ChannelParams = ChannelParams {
    function: "Voltage",
    units: "V",
    low_limit: "-0.099000",
    high_limit: "4.999000",
    min: "-10.00000",
    max: "10.00000",
    alarm: AlarmMode::HighOnly,
};

const VOLTAGE_PARAMS: ChannelParams = ChannelParams {
    function: "Voltage",
    units: "V",
    low_limit: "-9.9990000",
    high_limit: "9.999000",
    min: "-10.000000",
    max: "10.000000",
    alarm: AlarmMode::HighAndLow,
};

/// Column layout of a `[DAQmxChannel]` section in the hardware configuration file.
///
/// Each entry is (header, value). The row label comes first and the physical channel name
/// last; both are filled in per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaqmxProfile {
    pub columns: &'static [(&'static str, &'static str)],
}

pub const PHYSICAL_CHANNEL_HEADER: &str = "PhysicalChanName";

const THERMOCOUPLE_PROFILE: DaqmxProfile = DaqmxProfile {
    columns: &[
        ("AI.AutoZeroMode", "Every Sample"),
        ("AI.Max", "1372"),
        ("AI.MeasType", "Temperature:Thermocouple"),
        ("AI.Min", "-200"),
        ("AI.OpenThrmcplDetectEnable", "1"),
        ("AI.Temp.Units", "Deg C"),
        ("AI.Thrmcpl.CJCChan", ""),
        ("AI.Thrmcpl.CJCSrc", "Built-In"),
        ("AI.Thrmcpl.CJCVal", "25"),
        ("AI.Thrmcpl.Type", "K"),
        ("ChanType", "Analog Input"),
        ("Descr", ""),
    ],
};

const VOLTAGE_PROFILE: DaqmxProfile = DaqmxProfile {
    columns: &[
        ("AI.Max", "10"),
        ("AI.MeasType", "Voltage"),
        ("AI.Min", "-10"),
        ("AI.TermCfg", "RSE"),
        ("AI.Voltage.Units", "Volts"),
        ("ChanType", "Analog Input"),
        ("Descr", ""),
    ],
};

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        SENSOR_NAMES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("Voltage")
    }

    pub fn params(&self) -> &'static ChannelParams {
        match self {
            Self::Temperature => &THERMOCOUPLE_PARAMS,
            Self::HeatFlux => &HEAT_FLUX_PARAMS,
            Self::WindDirection | Self::WindVelocity => &WIND_PARAMS,
            Self::Oxygen | Self::CarbonMonoxide | Self::CarbonDioxide => &GAS_PARAMS,
            Self::Voltage => &VOLTAGE_PARAMS,
        }
    }

    /// Thermocouples get the thermocouple profile; every other input is wired as RSE voltage
    pub fn daqmx_profile(&self) -> &'static DaqmxProfile {
        match self {
            Self::Temperature => &THERMOCOUPLE_PROFILE,
            _ => &VOLTAGE_PROFILE,
        }
    }

    pub fn alarm_mode(&self) -> AlarmMode {
        self.params().alarm
    }
}

impl FromStr for SensorType {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(SENSOR_NAMES
            .iter()
            .find(|(name, _)| *name == trimmed)
            .map(|(_, kind)| *kind)
            .unwrap_or_default())
    }
}

impl From<String> for SensorType {
    fn from(value: String) -> Self {
        match Self::from_str(&value) {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<SensorType> for String {
    fn from(value: SensorType) -> Self {
        value.as_str().to_string()
    }
}

impl Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
