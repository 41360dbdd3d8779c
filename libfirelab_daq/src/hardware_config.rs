//! The tab separated hardware configuration file imported by the DAQmx configuration tool.
//!
//! The file sets up every physical channel of the system (thermocouple or voltage input),
//! together with the identity of the devices and terminal block accessories, so that the
//! channels do not need to be defined by hand. Every row ends with a trailing tab.
//!
//! Channel rows are labelled `PanNNChNN` with the in-panel index for every sensor type, so the
//! labels match the DAQmx global channels named in the `.chcfg` files even when a panel's range
//! does not start at device channel 0.
use std::io::Write;
use std::path::Path;

use super::config::HardwareConfig;
use super::error::HardwareConfigError;
use super::layout::PanelLayout;
use super::output::write_file_atomically;
use super::sensor_type::{SensorType, PHYSICAL_CHANNEL_HEADER};

const DEVICE_HEADER: [&str; 7] = [
    "[DAQmxDevice]",
    "BusType",
    "DevSerialNum",
    "ProductNum",
    "ProductType",
    "PXI.ChassisNum",
    "PXI.SlotNum",
];
const ACCESSORY_HEADER: [&str; 2] = ["[DAQmxAccessory]", "Accessory.SerialNum"];

/// Write one row: fields joined by tabs, plus the trailing empty field
fn write_row<W: Write, S: AsRef<str>>(writer: &mut W, fields: &[S]) -> std::io::Result<()> {
    for field in fields {
        write!(writer, "{}\t", field.as_ref())?;
    }
    writeln!(writer)
}

fn channel_header(sensor_type: SensorType) -> Vec<&'static str> {
    let profile = sensor_type.daqmx_profile();
    let mut header = Vec::with_capacity(profile.columns.len() + 2);
    header.push("[DAQmxChannel]");
    header.extend(profile.columns.iter().map(|(name, _)| *name));
    header.push(PHYSICAL_CHANNEL_HEADER);
    header
}

fn channel_row<'a>(sensor_type: SensorType, label: &'a str, physical: &'a str) -> Vec<&'a str> {
    let profile = sensor_type.daqmx_profile();
    let mut row = Vec::with_capacity(profile.columns.len() + 2);
    row.push(label);
    row.extend(profile.columns.iter().map(|(_, value)| *value));
    row.push(physical);
    row
}

/// Write the hardware configuration for the layout.
///
/// Channels are written panel by panel using the panel's default type. A `[DAQmxChannel]`
/// header is written before the first panel and again whenever a panel's type differs from
/// the panel before it.
pub fn write_hardware_config<W: Write>(
    writer: &mut W,
    layout: &PanelLayout,
    hardware: &HardwareConfig,
) -> Result<(), HardwareConfigError> {
    let [major, minor] = hardware.daqmx_version;
    write_row(writer, &["[DAQmx]", "MajorVersion", "MinorVersion"])?;
    write_row(writer, &[String::new(), major.to_string(), minor.to_string()])?;

    let mut last_type: Option<SensorType> = None;
    for panel in layout.panels() {
        if last_type != Some(panel.default_type) {
            writeln!(writer)?;
            write_row(writer, &channel_header(panel.default_type))?;
        }
        for device_channel in panel.device_channels() {
            let in_panel_index = device_channel - panel.channel_start;
            let label = panel.synthesized_label(in_panel_index);
            let physical = panel.physical_channel(layout.system_id(), in_panel_index);
            write_row(writer, &channel_row(panel.default_type, &label, &physical))?;
        }
        last_type = Some(panel.default_type);
    }

    writeln!(writer)?;
    write_row(writer, &DEVICE_HEADER)?;
    for device in hardware.devices.iter() {
        if device.name.is_empty() {
            return Err(HardwareConfigError::EmptyDeviceName);
        }
        write_row(
            writer,
            &[
                &device.name,
                &device.bus_type,
                &device.serial_num,
                &device.product_num,
                &device.product_type,
                &device.chassis_num,
                &device.slot_num,
            ],
        )?;
    }

    writeln!(writer)?;
    write_row(writer, &ACCESSORY_HEADER)?;
    for accessory in hardware.accessories.iter() {
        write_row(writer, &[&accessory.physical_channel, &accessory.serial_num])?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Write the hardware configuration file. The file is closed before this returns
pub fn emit_hardware_config_file(
    path: &Path,
    layout: &PanelLayout,
    hardware: &HardwareConfig,
) -> Result<(), HardwareConfigError> {
    write_file_atomically(path, |writer| {
        write_hardware_config(writer, layout, hardware)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessoryInfo, DeviceInfo, PanelDef};
    use std::collections::BTreeMap;

    fn render(layout: &PanelLayout, hardware: &HardwareConfig) -> String {
        let mut buffer: Vec<u8> = Vec::new();
        write_hardware_config(&mut buffer, layout, hardware).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn hardware() -> HardwareConfig {
        HardwareConfig {
            enabled: true,
            daqmx_version: [19, 5],
            devices: vec![DeviceInfo {
                name: String::from("SYS1Slot2"),
                bus_type: String::from("PXIe"),
                serial_num: String::from("0x1E38119"),
                product_num: String::from("0x74B2C4C4"),
                product_type: String::from("PXIe-4353"),
                chassis_num: String::from("1"),
                slot_num: String::from("2"),
            }],
            accessories: vec![AccessoryInfo {
                physical_channel: String::from("TC-4353/SYS1Slot2/0"),
                serial_num: String::from("31755019"),
            }],
        }
    }

    #[test]
    fn test_full_file() {
        let layout = PanelLayout::new(
            "SYS1",
            &BTreeMap::from([
                (1, PanelDef::new(2, SensorType::Temperature)),
                (2, PanelDef::new(8, SensorType::Voltage)),
            ]),
            &BTreeMap::from([(1, [0, 1]), (2, [32, 33])]),
        )
        .unwrap();
        let text = render(&layout, &hardware());
        let expected = "[DAQmx]\tMajorVersion\tMinorVersion\t
\t19\t5\t

[DAQmxChannel]\tAI.AutoZeroMode\tAI.Max\tAI.MeasType\tAI.Min\tAI.OpenThrmcplDetectEnable\tAI.Temp.Units\tAI.Thrmcpl.CJCChan\tAI.Thrmcpl.CJCSrc\tAI.Thrmcpl.CJCVal\tAI.Thrmcpl.Type\tChanType\tDescr\tPhysicalChanName\t
Pan01Ch00\tEvery Sample\t1372\tTemperature:Thermocouple\t-200\t1\tDeg C\t\tBuilt-In\t25\tK\tAnalog Input\t\tSYS1Slot2/ai0\t

[DAQmxChannel]\tAI.Max\tAI.MeasType\tAI.Min\tAI.TermCfg\tAI.Voltage.Units\tChanType\tDescr\tPhysicalChanName\t
Pan02Ch00\t10\tVoltage\t-10\tRSE\tVolts\tAnalog Input\t\tSYS1Slot8/ai32\t

[DAQmxDevice]\tBusType\tDevSerialNum\tProductNum\tProductType\tPXI.ChassisNum\tPXI.SlotNum\t
SYS1Slot2\tPXIe\t0x1E38119\t0x74B2C4C4\tPXIe-4353\t1\t2\t

[DAQmxAccessory]\tAccessory.SerialNum\t
TC-4353/SYS1Slot2/0\t31755019\t

";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_header_only_on_type_change() {
        let layout = PanelLayout::new(
            "SYS1",
            &BTreeMap::from([
                (1, PanelDef::new(2, SensorType::Temperature)),
                (2, PanelDef::new(3, SensorType::Temperature)),
                (3, PanelDef::new(8, SensorType::Voltage)),
                (4, PanelDef::new(8, SensorType::Voltage)),
                (5, PanelDef::new(4, SensorType::Temperature)),
            ]),
            &BTreeMap::from([
                (1, [0, 2]),
                (2, [0, 2]),
                (3, [0, 2]),
                (4, [2, 4]),
                (5, [0, 2]),
            ]),
        )
        .unwrap();
        let text = render(&layout, &hardware());
        let lines: Vec<&str> = text.lines().collect();

        let header_positions: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.starts_with("[DAQmxChannel]"))
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(header_positions.len(), 3);

        // Each header sits right before the first row of its run of panels
        assert!(lines[header_positions[0] + 1].starts_with("Pan01Ch00\tEvery Sample"));
        assert!(lines[header_positions[1] + 1].starts_with("Pan03Ch00\t10\tVoltage"));
        assert!(lines[header_positions[2] + 1].starts_with("Pan05Ch00\tEvery Sample"));

        // Panel 4 continues the voltage section without a header
        assert!(lines.iter().any(|l| l.starts_with("Pan04Ch01\t") && l.contains("SYS1Slot8/ai3\t")));
        let channel_rows = lines.iter().filter(|l| l.starts_with("Pan")).count();
        assert_eq!(channel_rows, layout.total_channels());
    }

    #[test]
    fn test_empty_device_name() {
        let layout = PanelLayout::new(
            "SYS1",
            &BTreeMap::from([(1, PanelDef::new(2, SensorType::Temperature))]),
            &BTreeMap::from([(1, [0, 1])]),
        )
        .unwrap();
        let mut hw = hardware();
        hw.devices[0].name.clear();
        let mut buffer: Vec<u8> = Vec::new();
        let result = write_hardware_config(&mut buffer, &layout, &hw);
        assert!(matches!(result, Err(HardwareConfigError::EmptyDeviceName)));
    }

    #[test]
    fn test_offset_thermocouple_panel_uses_in_panel_index() {
        let layout = PanelLayout::new(
            "SYS1",
            &BTreeMap::from([(1, PanelDef::new(2, SensorType::Temperature))]),
            &BTreeMap::from([(1, [4, 6])]),
        )
        .unwrap();
        let text = render(&layout, &hardware());
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("Pan")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("Pan01Ch00\tEvery Sample"));
        assert!(rows[0].ends_with("\tSYS1Slot2/ai4\t"));
        assert!(rows[1].starts_with("Pan01Ch01\t"));
        assert!(rows[1].ends_with("\tSYS1Slot2/ai5\t"));
    }
}
