//! # firelab_daq
//!
//! firelab_daq generates the channel configuration files for the fire test lab's PXI data
//! acquisition, and reduces the test data the acquisition records. It takes the per-test
//! channel lists kept by the lab (which sensor is wired to which panel channel) and writes a
//! `.chcfg` file the acquisition program can load directly, so that channel names, sensor
//! functions, units and alarm limits never have to be entered by hand. It can also write a
//! DAQmx hardware configuration file which sets up every physical channel of the chassis.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./firelab_daq_cli` from the top
//! level repository. The binary is installed to your cargo install location (typically
//! `~/.cargo/bin/`). To use the CLI see the `firelab_daq_cli` README.
//!
//! ## Configuration
//!
//! The DAQ topology and all paths are given in a YAML file. A template can be generated
//! with `firelab_daq_cli -p config.yml new`; it describes the lab chassis:
//!
//! ```yml
//! channel_list_dir: ./1_Info/Data_Channels
//! system_id: PXI1
//! duplicates: error
//! panel_defs:
//!   1: { slot: 2, default_type: Temperature }
//!   7: { slot: 8, default_type: Voltage }
//! panel_chans:
//!   1: [0, 32]
//!   7: [0, 32]
//! hardware_config:
//!   enabled: false
//!   daqmx_version: [19, 5]
//!   devices:
//!     - { name: PXI1Slot2, bus_type: PXIe, serial_num: '0x1E38119', product_num: '0x74B2C4C4', product_type: PXIe-4353, chassis_num: '1', slot_num: '2' }
//!   accessories:
//!     - { physical_channel: TC-4353/PXI1Slot2/0, serial_num: '31755019' }
//! reduction: null
//! ```
//!
//! - `panel_defs` maps a panel number to the chassis slot of its device and the sensor type
//! its unused channels are configured as.
//! - `panel_chans` maps a panel number to the device channels it owns, `[start, end)`.
//! Several panels can share one device as long as their ranges do not overlap.
//! - `duplicates` is `error` (reject a channel list naming a channel or a panel channel
//! twice) or `last_wins` (keep the later row and warn).
//!
//! ### Channel List Format
//!
//! Every file in `channel_list_dir` ending in `channel_list.csv` (any case) is converted.
//!
//! ```csv
//! Channel_Name,Panel,Channel,Type
//! TC_A1,1,0,Temperature
//! HF_1,7,3,Heat_Flux
//! ```
//!
//! `Channel` is the index inside the panel. Known types are `Temperature`, `Heat_Flux`,
//! `Wind_Direction`, `Wind_Velo`, `Oxygen`, `Carbon_Monoxide` and `Carbon_Dioxide`; anything
//! else is configured as a plain voltage input.
//!
//! ## Output
//!
//! - `<name>.chcfg` next to each channel list, holding one block per physical channel of
//! the system. Channels in the list are enabled with their name; all others are disabled
//! and named `PanNNChNN`.
//! - `<system_id>_configData.txt` in `channel_list_dir` when `hardware_config.enabled` is
//! set.
//!
//! Files are written to a `.part` file first and only renamed into place once complete.
//!
//! ## Test Data Reduction
//!
//! `firelab_daq_cli -p config.yml reduce` converts recorded tests to engineering units using
//! the `reduction` section of the config. See [`reduction`] for the channel list format and
//! [`test_data`] for the recorded file format.
//!
//! Each test gives `<test>_reduced.csv` (time after ignition, one column per channel and an
//! `Event` column), `<test>_stats.csv` and, unless `charts: false`, one SVG chart per chart
//! group under `<test>/`. See [`charts`].
pub mod channel_list;
pub mod charts;
pub mod chcfg;
pub mod config;
pub mod error;
pub mod filters;
pub mod hardware_config;
pub mod layout;
pub mod output;
pub mod process;
pub mod reduction;
pub mod sensor_type;
pub mod status;
pub mod test_data;
