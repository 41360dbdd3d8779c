//! The `.chcfg` channel configuration format read by the acquisition program.
//!
//! The file lists every physical channel of the system, used or not:
//!
//! ```text
//! [Saved Channels IN]
//! Valid Channel Arrray.<size(s)> = "2"
//! Valid Channel Arrray 0.Use? = "FALSE"
//! Valid Channel Arrray 0.Channel Name = "Pan01Ch00"
//! ...
//! ```
//!
//! `Arrray` is spelled with three r's: it is the control label the acquisition program
//! saves, and the program only loads files that match it exactly.
use std::io::Write;
use std::path::Path;

use super::channel_list::ActiveInputs;
use super::error::EmitterError;
use super::layout::PanelLayout;
use super::output::write_file_atomically;
use super::sensor_type::SensorType;

pub const SECTION_HEADER: &str = "[Saved Channels IN]";
const ARRAY_KEY: &str = "Valid Channel Arrray";
/// Written ahead of the label in the global channel field; six literal characters
/// (`\00` three times) and a tab
const GLOBAL_CHANNEL_PREFIX: &str = "\\00\\00\\00\t";

/// One block of the `.chcfg`, i.e. one physical channel slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub array_index: usize,
    pub enabled: bool,
    pub sensor_type: SensorType,
    pub panel: u32,
    pub in_panel_index: u32,
    pub label: String,
    pub physical_channel: String,
}

impl ChannelRecord {
    /// The `PanNNChNN` name of the slot, regardless of the channel's label
    pub fn synthesized_label(&self) -> String {
        format!("Pan{:02}Ch{:02}", self.panel, self.in_panel_index)
    }
}

/// Build the record of every physical channel in panel order, then in-panel index order.
///
/// Channels named in the channel list are enabled and take the list's name and type. All
/// other channels are disabled and take the panel's default type and a synthesized label.
pub fn build_channel_records(layout: &PanelLayout, active: &ActiveInputs) -> Vec<ChannelRecord> {
    let mut records: Vec<ChannelRecord> = Vec::with_capacity(layout.total_channels());
    for panel in layout.panels() {
        let active_channels = active.panel(panel.number);
        for in_panel_index in 0..panel.width() {
            let physical_channel = panel.physical_channel(layout.system_id(), in_panel_index);
            let record = match active_channels.and_then(|p| p.get(&in_panel_index)) {
                Some(channel) => ChannelRecord {
                    array_index: records.len(),
                    enabled: true,
                    sensor_type: channel.sensor_type,
                    panel: panel.number,
                    in_panel_index,
                    label: channel.name.clone(),
                    physical_channel,
                },
                None => ChannelRecord {
                    array_index: records.len(),
                    enabled: false,
                    sensor_type: panel.default_type,
                    panel: panel.number,
                    in_panel_index,
                    label: panel.synthesized_label(in_panel_index),
                    physical_channel,
                },
            };
            records.push(record);
        }
    }
    records
}

/// Write a full `.chcfg`: the section header, the channel count and every record
pub fn write_chcfg<W: Write>(writer: &mut W, records: &[ChannelRecord]) -> std::io::Result<()> {
    writeln!(writer, "{SECTION_HEADER}")?;
    writeln!(writer, "{ARRAY_KEY}.<size(s)> = \"{}\"", records.len())?;
    for record in records {
        write_record(writer, record)?;
    }
    Ok(())
}

/// Write the key lines of one channel block
pub fn write_record<W: Write>(writer: &mut W, record: &ChannelRecord) -> std::io::Result<()> {
    let params = record.sensor_type.params();
    let prefix = format!("{ARRAY_KEY} {}.", record.array_index);
    let use_value = if record.enabled { "TRUE" } else { "FALSE" };

    writeln!(writer, "{prefix}Use? = \"{use_value}\"")?;
    writeln!(writer, "{prefix}Channel Name = \"{}\"", record.label)?;
    writeln!(writer, "{prefix}Channel Function = \"{}\"", params.function)?;
    writeln!(writer, "{prefix}Units = \"{}\"", params.units)?;
    writeln!(
        writer,
        "{prefix}Physical Channel = \"{}\"",
        record.physical_channel
    )?;
    writeln!(
        writer,
        "{prefix}DAQmx Global Channel = \"{GLOBAL_CHANNEL_PREFIX}{}\"",
        record.synthesized_label()
    )?;
    writeln!(
        writer,
        "{prefix}Alarm Info.Alarm = \"{}\"",
        params.alarm.as_str()
    )?;
    writeln!(
        writer,
        "{prefix}Alarm Info.Low Limit = \"{}\"",
        params.low_limit
    )?;
    writeln!(
        writer,
        "{prefix}Alarm Info.High Limit = \"{}\"",
        params.high_limit
    )?;
    writeln!(writer, "{prefix}Min = \"{}\"", params.min)?;
    writeln!(writer, "{prefix}Max = \"{}\"", params.max)?;
    Ok(())
}

/// Write the records to a `.chcfg` file. The file only appears once it is complete
pub fn emit_chcfg_file(path: &Path, records: &[ChannelRecord]) -> Result<(), EmitterError> {
    write_file_atomically(path, |writer| {
        write_chcfg(writer, records).map_err(EmitterError::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_list::read_channel_list;
    use crate::config::{DuplicatePolicy, PanelDef};
    use crate::sensor_type::AlarmMode;
    use std::collections::BTreeMap;

    fn single_panel_layout() -> PanelLayout {
        PanelLayout::new(
            "SYS1",
            &BTreeMap::from([(1, PanelDef::new(2, SensorType::Temperature))]),
            &BTreeMap::from([(1, [0, 2])]),
        )
        .unwrap()
    }

    fn two_panel_layout() -> PanelLayout {
        PanelLayout::new(
            "PXI1",
            &BTreeMap::from([
                (1, PanelDef::new(2, SensorType::Temperature)),
                (7, PanelDef::new(8, SensorType::Voltage)),
                (8, PanelDef::new(8, SensorType::Voltage)),
            ]),
            &BTreeMap::from([(1, [0, 3]), (7, [0, 2]), (8, [2, 6])]),
        )
        .unwrap()
    }

    fn active(layout: &PanelLayout, contents: &str) -> ActiveInputs {
        read_channel_list(
            contents.as_bytes(),
            Path::new("channel_list.csv"),
            layout,
            DuplicatePolicy::Error,
        )
        .unwrap()
    }

    fn render(records: &[ChannelRecord]) -> String {
        let mut buffer: Vec<u8> = Vec::new();
        write_chcfg(&mut buffer, records).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_inactive_panel() {
        let layout = single_panel_layout();
        let records = build_channel_records(&layout, &ActiveInputs::default());
        assert_eq!(records.len(), 2);
        let expected = [("SYS1Slot2/ai0", "Pan01Ch00"), ("SYS1Slot2/ai1", "Pan01Ch01")];
        for (record, (phys, label)) in records.iter().zip(expected) {
            assert!(!record.enabled);
            assert_eq!(record.sensor_type, SensorType::Temperature);
            assert_eq!(record.physical_channel, phys);
            assert_eq!(record.label, label);
        }
    }

    #[test]
    fn test_active_channel() {
        let layout = single_panel_layout();
        let inputs = active(&layout, "Channel_Name,Panel,Channel,Type\nTC1,1,1,Temperature\n");
        let records = build_channel_records(&layout, &inputs);
        assert_eq!(records.len(), 2);
        assert!(!records[0].enabled);
        assert_eq!(records[0].label, "Pan01Ch00");
        assert_eq!(records[0].sensor_type, SensorType::Temperature);
        assert!(records[1].enabled);
        assert_eq!(records[1].label, "TC1");
        assert_eq!(records[1].physical_channel, "SYS1Slot2/ai1");
    }

    #[test]
    fn test_count_and_dense_indices() {
        let layout = two_panel_layout();
        let inputs = active(
            &layout,
            "Channel_Name,Panel,Channel,Type\nO2,8,1,Oxygen\nHF,1,2,Heat_Flux\n",
        );
        let records = build_channel_records(&layout, &inputs);
        assert_eq!(records.len(), layout.total_channels());
        assert_eq!(records.len(), 9);
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(record.array_index, idx);
        }

        // Panel 7 has no rows in the list
        for record in records.iter().filter(|r| r.panel == 7) {
            assert!(!record.enabled);
            assert_eq!(record.sensor_type, SensorType::Voltage);
        }

        let o2 = records.iter().find(|r| r.label == "O2").unwrap();
        assert_eq!(o2.physical_channel, "PXI1Slot8/ai3");
        assert_eq!(o2.sensor_type.alarm_mode(), AlarmMode::HighOnly);
        let hf = records.iter().find(|r| r.label == "HF").unwrap();
        assert_eq!(hf.sensor_type, SensorType::HeatFlux);
        assert_eq!(hf.array_index, 2);

        let text = render(&records);
        assert!(text.starts_with("[Saved Channels IN]\nValid Channel Arrray.<size(s)> = \"9\"\n"));
        assert_eq!(text.lines().count(), 2 + 11 * 9);
    }

    #[test]
    fn test_record_block_format() {
        let layout = single_panel_layout();
        let inputs = active(&layout, "Channel_Name,Panel,Channel,Type\nTC1,1,1,Temperature\n");
        let records = build_channel_records(&layout, &inputs);
        let text = render(&records);
        let expected = "[Saved Channels IN]
Valid Channel Arrray.<size(s)> = \"2\"
Valid Channel Arrray 0.Use? = \"FALSE\"
Valid Channel Arrray 0.Channel Name = \"Pan01Ch00\"
Valid Channel Arrray 0.Channel Function = \"Thermocouple (K)\"
Valid Channel Arrray 0.Units = \"C\"
Valid Channel Arrray 0.Physical Channel = \"SYS1Slot2/ai0\"
Valid Channel Arrray 0.DAQmx Global Channel = \"\\00\\00\\00\tPan01Ch00\"
Valid Channel Arrray 0.Alarm Info.Alarm = \"High and Low\"
Valid Channel Arrray 0.Alarm Info.Low Limit = \"-17.777800\"
Valid Channel Arrray 0.Alarm Info.High Limit = \"1230.00000\"
Valid Channel Arrray 0.Min = \"-245.729755\"
Valid Channel Arrray 0.Max = \"1232.065825\"
Valid Channel Arrray 1.Use? = \"TRUE\"
Valid Channel Arrray 1.Channel Name = \"TC1\"
Valid Channel Arrray 1.Channel Function = \"Thermocouple (K)\"
Valid Channel Arrray 1.Units = \"C\"
Valid Channel Arrray 1.Physical Channel = \"SYS1Slot2/ai1\"
Valid Channel Arrray 1.DAQmx Global Channel = \"\\00\\00\\00\tPan01Ch01\"
Valid Channel Arrray 1.Alarm Info.Alarm = \"High and Low\"
Valid Channel Arrray 1.Alarm Info.Low Limit = \"-17.777800\"
Valid Channel Arrray 1.Alarm Info.High Limit = \"1230.00000\"
Valid Channel Arrray 1.Min = \"-245.729755\"
Valid Channel Arrray 1.Max = \"1232.065825\"
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_gas_block() {
        let record = ChannelRecord {
            array_index: 12,
            enabled: true,
            sensor_type: SensorType::CarbonMonoxide,
            panel: 9,
            in_panel_index: 4,
            label: String::from("CO_1"),
            physical_channel: String::from("PXI1Slot8/ai68"),
        };
        let mut buffer: Vec<u8> = Vec::new();
        write_record(&mut buffer, &record).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Valid Channel Arrray 12.Alarm Info.Alarm = \"High Only\"\n"));
        assert!(text.contains("Valid Channel Arrray 12.Alarm Info.High Limit = \"4.999000\"\n"));
        assert!(text.contains("Valid Channel Arrray 12.Channel Name = \"CO_1\"\n"));
        // The global channel always carries the slot name, never the list name
        assert!(text.contains("DAQmx Global Channel = \"\\00\\00\\00\tPan09Ch04\"\n"));
    }

    #[test]
    fn test_emit_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("list.chcfg");
        let records = build_channel_records(&single_panel_layout(), &ActiveInputs::default());
        let result = emit_chcfg_file(&path, &records);
        assert!(matches!(result, Err(EmitterError::IOError(_))));
        assert!(!path.exists());

        let path = dir.path().join("list.chcfg");
        emit_chcfg_file(&path, &records).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), render(&records));
    }
}
