use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, LayoutError};
use super::layout::PanelLayout;
use super::sensor_type::SensorType;

/// Suffix (compared case-insensitively) of the channel list files the emitter picks up
pub const CHANNEL_LIST_SUFFIX: &str = "channel_list.csv";

/// What to do when two channel list rows claim the same name or the same panel channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Reject the channel list
    #[default]
    Error,
    /// Keep the later row and log a warning
    LastWins,
}

/// A panel of the DAQ: the chassis slot it is wired to and the sensor type its unused
/// channels are configured as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelDef {
    pub slot: u32,
    pub default_type: SensorType,
}

impl PanelDef {
    pub fn new(slot: u32, default_type: SensorType) -> Self {
        Self { slot, default_type }
    }
}

/// Identity row of a DAQmx device for the hardware configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub bus_type: String,
    pub serial_num: String,
    pub product_num: String,
    pub product_type: String,
    pub chassis_num: String,
    pub slot_num: String,
}

/// Identity row of a DAQmx accessory (terminal block) for the hardware configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInfo {
    pub physical_channel: String,
    pub serial_num: String,
}

/// Settings for the optional hardware configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub enabled: bool,
    /// [major, minor]
    pub daqmx_version: [u32; 2],
    pub devices: Vec<DeviceInfo>,
    pub accessories: Vec<AccessoryInfo>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            daqmx_version: [19, 5],
            devices: Vec::new(),
            accessories: Vec::new(),
        }
    }
}

/// Settings for the test data reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionConfig {
    pub channel_list: PathBuf,
    #[serde(default)]
    pub test_description: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,
    #[serde(default = "default_savgol_window")]
    pub savgol_window: usize,
    #[serde(default = "default_savgol_order")]
    pub savgol_order: usize,
    /// Draw an SVG chart per chart group of each test
    #[serde(default = "default_charts")]
    pub charts: bool,
}

fn default_moving_average_window() -> usize {
    5
}

fn default_savgol_window() -> usize {
    51
}

fn default_savgol_order() -> usize {
    5
}

fn default_charts() -> bool {
    true
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            channel_list: PathBuf::from("None"),
            test_description: None,
            data_dir: PathBuf::from("None"),
            output_dir: PathBuf::from("None"),
            moving_average_window: default_moving_average_window(),
            savgol_window: default_savgol_window(),
            savgol_order: default_savgol_order(),
            charts: default_charts(),
        }
    }
}

/// Structure representing the application configuration. Contains pathing, the DAQ panel
/// topology and the hardware tables.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub channel_list_dir: PathBuf,
    pub system_id: String,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    pub panel_defs: BTreeMap<u32, PanelDef>,
    /// Panel number -> [first device channel, end device channel)
    pub panel_chans: BTreeMap<u32, [u32; 2]>,
    #[serde(default)]
    pub hardware_config: HardwareConfig,
    #[serde(default)]
    pub reduction: Option<ReductionConfig>,
}

impl Default for Config {
    /// Generate a new Config for the lab PXI chassis: six thermocouple panels in slots 2-7 and
    /// four voltage panels sharing slot 8. Paths are empty/invalid
    fn default() -> Self {
        let system_id = String::from("PXI1");
        let mut panel_defs = BTreeMap::new();
        let mut panel_chans = BTreeMap::new();
        for panel in 1..=6 {
            panel_defs.insert(panel, PanelDef::new(panel + 1, SensorType::Temperature));
            panel_chans.insert(panel, [0, 32]);
        }
        for panel in 7..=10 {
            panel_defs.insert(panel, PanelDef::new(8, SensorType::Voltage));
            panel_chans.insert(panel, [(panel - 7) * 32, (panel - 6) * 32]);
        }

        let device = |slot: u32, bus: &str, serial: &str, product: &str, kind: &str| DeviceInfo {
            name: format!("{system_id}Slot{slot}"),
            bus_type: String::from(bus),
            serial_num: String::from(serial),
            product_num: String::from(product),
            product_type: String::from(kind),
            chassis_num: String::from("1"),
            slot_num: slot.to_string(),
        };
        let hardware_config = HardwareConfig {
            enabled: false,
            daqmx_version: [19, 5],
            devices: vec![
                device(2, "PXIe", "0x1E38119", "0x74B2C4C4", "PXIe-4353"),
                device(3, "PXIe", "0x1E38110", "0x74B2C4C4", "PXIe-4353"),
                device(4, "PXIe", "0x1E27AE9", "0x77A6C4C4", "PXIe-6355"),
                device(5, "PXI", "0x1E56289", "0x1E40", "PXI-6624"),
            ],
            accessories: vec![
                AccessoryInfo {
                    physical_channel: format!("TC-4353/{system_id}Slot2/0"),
                    serial_num: String::from("31755019"),
                },
                AccessoryInfo {
                    physical_channel: format!("TC-4353/{system_id}Slot3/0"),
                    serial_num: String::from("31619400"),
                },
            ],
        };

        Self {
            channel_list_dir: PathBuf::from("None"),
            system_id,
            duplicates: DuplicatePolicy::default(),
            panel_defs,
            panel_chans,
            hardware_config,
            reduction: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        // Surface layout mistakes at load time rather than on the first channel list
        config.panel_layout()?;
        Ok(config)
    }

    /// Build the validated panel layout from panel_defs and panel_chans
    pub fn panel_layout(&self) -> Result<PanelLayout, LayoutError> {
        PanelLayout::new(&self.system_id, &self.panel_defs, &self.panel_chans)
    }

    /// Get all of the channel list files in the channel list directory, sorted by name
    pub fn get_channel_list_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if !self.channel_list_dir.is_dir() {
            return Err(ConfigError::BadFilePath(self.channel_list_dir.clone()));
        }
        let mut file_list: Vec<PathBuf> = Vec::new();
        for item in self.channel_list_dir.read_dir()? {
            let item_path = item?.path();
            if !item_path.is_file() {
                continue;
            }
            if let Some(name) = item_path.file_name() {
                if is_channel_list_name(&name.to_string_lossy()) {
                    file_list.push(item_path);
                }
            }
        }
        file_list.sort();
        Ok(file_list)
    }

    /// Get the path to the hardware configuration file
    pub fn get_hardware_config_path(&self) -> PathBuf {
        self.channel_list_dir
            .join(format!("{}_configData.txt", self.system_id))
    }

    pub fn need_hardware_config(&self) -> bool {
        self.hardware_config.enabled
    }

    pub fn has_reduction(&self) -> bool {
        self.reduction.is_some()
    }
}

/// Channel lists are matched on the end of the file name, ignoring case
pub fn is_channel_list_name(name: &str) -> bool {
    name.to_lowercase().ends_with(CHANNEL_LIST_SUFFIX)
}

/// Get the path to the channel config written for a channel list
pub fn get_chcfg_path(channel_list: &Path) -> PathBuf {
    channel_list.with_extension("chcfg")
}
