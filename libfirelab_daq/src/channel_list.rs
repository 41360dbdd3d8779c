//! Loading of channel lists.
//!
//! A channel list is a CSV file with one row per *active* channel:
//!
//! ```csv
//! Channel_Name,Panel,Channel,Type
//! TC_A1,1,0,Temperature
//! HF_1,7,3,Heat_Flux
//! ```
//!
//! `Channel` is the index inside the panel, not the device channel. Extra columns are
//! ignored. Rows are validated against the [`PanelLayout`] and grouped by panel into
//! [`ActiveInputs`].
use fxhash::FxHashMap;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::config::DuplicatePolicy;
use super::error::ChannelListError;
use super::layout::PanelLayout;
use super::sensor_type::SensorType;

const REQUIRED_COLUMNS: [&str; 4] = ["Channel_Name", "Panel", "Channel", "Type"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelListRow {
    #[serde(rename = "Channel_Name")]
    pub channel_name: String,
    #[serde(rename = "Panel")]
    pub panel: u32,
    #[serde(rename = "Channel")]
    pub channel: u32,
    #[serde(rename = "Type")]
    pub sensor_type: SensorType,
}

/// An active channel, i.e. a channel list row placed in its panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChannel {
    pub name: String,
    pub sensor_type: SensorType,
    /// Line of the row in the channel list (1-based, header is line 1)
    pub line: u64,
}

/// Active channels of one channel list, grouped as panel -> in-panel index -> channel
#[derive(Debug, Clone, Default)]
pub struct ActiveInputs {
    panels: FxHashMap<u32, FxHashMap<u32, ActiveChannel>>,
    names: FxHashMap<String, (u32, u32)>,
}

impl ActiveInputs {
    /// Active channels of a panel. None if the channel list has no rows for the panel
    pub fn panel(&self, number: u32) -> Option<&FxHashMap<u32, ActiveChannel>> {
        self.panels.get(&number)
    }

    pub fn get(&self, panel: u32, channel: u32) -> Option<&ActiveChannel> {
        self.panels.get(&panel).and_then(|p| p.get(&channel))
    }

    /// Number of active channels
    pub fn len(&self) -> usize {
        self.panels.values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Place a validated row. Duplicates are handled per the policy
    fn insert(
        &mut self,
        path: &Path,
        line: u64,
        row: ChannelListRow,
        policy: DuplicatePolicy,
    ) -> Result<(), ChannelListError> {
        if let Some((panel, channel)) = self.names.get(&row.channel_name).copied() {
            let first_line = self.get(panel, channel).map(|c| c.line).unwrap_or_default();
            match policy {
                DuplicatePolicy::Error => {
                    return Err(ChannelListError::DuplicateName {
                        path: path.to_path_buf(),
                        line,
                        name: row.channel_name,
                        first_line,
                    })
                }
                DuplicatePolicy::LastWins => {
                    log::warn!(
                        "{} line {line}: channel name {} replaces its use on line {first_line}",
                        path.display(),
                        row.channel_name
                    );
                    if let Some(p) = self.panels.get_mut(&panel) {
                        p.remove(&channel);
                    }
                }
            }
        }

        let slots = self.panels.entry(row.panel).or_default();
        if let Some(existing) = slots.get(&row.channel) {
            match policy {
                DuplicatePolicy::Error => {
                    return Err(ChannelListError::DuplicateSlot {
                        path: path.to_path_buf(),
                        line,
                        panel: row.panel,
                        channel: row.channel,
                        existing: existing.name.clone(),
                    })
                }
                DuplicatePolicy::LastWins => {
                    log::warn!(
                        "{} line {line}: {} replaces {} on panel {} channel {}",
                        path.display(),
                        row.channel_name,
                        existing.name,
                        row.panel,
                        row.channel
                    );
                    self.names.remove(&existing.name);
                }
            }
        }

        self.names
            .insert(row.channel_name.clone(), (row.panel, row.channel));
        slots.insert(
            row.channel,
            ActiveChannel {
                name: row.channel_name,
                sensor_type: row.sensor_type,
                line,
            },
        );
        Ok(())
    }
}

/// Read a channel list file and place its rows in the layout
pub fn load_channel_list(
    path: &Path,
    layout: &PanelLayout,
    policy: DuplicatePolicy,
) -> Result<ActiveInputs, ChannelListError> {
    let file = File::open(path).map_err(|e| ChannelListError::Csv {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    read_channel_list(file, path, layout, policy)
}

/// Read a channel list from any reader. `source` is only used for error messages
pub fn read_channel_list<R: Read>(
    reader: R,
    source: &Path,
    layout: &PanelLayout,
    policy: DuplicatePolicy,
) -> Result<ActiveInputs, ChannelListError> {
    let csv_error = |e: csv::Error| ChannelListError::Csv {
        path: PathBuf::from(source),
        source: e,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?.clone();
    let mut inputs = ActiveInputs::default();
    if headers.is_empty() {
        log::warn!("Channel list {} is empty", source.display());
        return Ok(inputs);
    }
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(ChannelListError::MissingColumn {
                path: source.to_path_buf(),
                column,
            });
        }
    }

    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: ChannelListRow = record.deserialize(Some(&headers)).map_err(csv_error)?;

        let panel = match layout.panel(row.panel) {
            Some(p) => p,
            None => {
                return Err(ChannelListError::UnknownPanel {
                    path: source.to_path_buf(),
                    line,
                    panel: row.panel,
                })
            }
        };
        if row.channel >= panel.width() {
            return Err(ChannelListError::ChannelOutOfRange {
                path: source.to_path_buf(),
                line,
                panel: row.panel,
                channel: row.channel,
                width: panel.width(),
            });
        }
        inputs.insert(source, line, row, policy)?;
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelDef;
    use std::collections::BTreeMap;

    fn test_layout() -> PanelLayout {
        PanelLayout::new(
            "SYS1",
            &BTreeMap::from([
                (1, PanelDef::new(2, SensorType::Temperature)),
                (2, PanelDef::new(3, SensorType::Voltage)),
            ]),
            &BTreeMap::from([(1, [0, 2]), (2, [4, 8])]),
        )
        .unwrap()
    }

    fn read(contents: &str, policy: DuplicatePolicy) -> Result<ActiveInputs, ChannelListError> {
        read_channel_list(
            contents.as_bytes(),
            Path::new("test_channel_list.csv"),
            &test_layout(),
            policy,
        )
    }

    #[test]
    fn test_groups_by_panel() {
        let inputs = read(
            "Channel_Name,Panel,Channel,Type,Notes\nTC1,1,1,Temperature,\nO2,2,3,Oxygen,front\n",
            DuplicatePolicy::Error,
        )
        .unwrap();
        assert_eq!(inputs.len(), 2);
        let tc = inputs.get(1, 1).unwrap();
        assert_eq!(tc.name, "TC1");
        assert_eq!(tc.sensor_type, SensorType::Temperature);
        assert_eq!(tc.line, 2);
        assert_eq!(inputs.get(2, 3).unwrap().sensor_type, SensorType::Oxygen);
        assert!(inputs.get(1, 0).is_none());
        assert!(inputs.panel(2).is_some());
    }

    #[test]
    fn test_header_only_and_empty() {
        let inputs = read("Channel_Name,Panel,Channel,Type\n", DuplicatePolicy::Error).unwrap();
        assert!(inputs.is_empty());
        assert!(inputs.panel(1).is_none());

        let inputs = read("", DuplicatePolicy::Error).unwrap();
        assert!(inputs.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let result = read("Channel_Name,Panel,Type\nTC1,1,Temperature\n", DuplicatePolicy::Error);
        assert!(matches!(
            result,
            Err(ChannelListError::MissingColumn {
                column: "Channel",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_panel_and_range() {
        let result = read(
            "Channel_Name,Panel,Channel,Type\nTC1,1,0,Temperature\nTC9,9,0,Temperature\n",
            DuplicatePolicy::Error,
        );
        assert!(matches!(
            result,
            Err(ChannelListError::UnknownPanel {
                line: 3,
                panel: 9,
                ..
            })
        ));

        // Panel 2 owns device channels 4..8, so in-panel indices 0..4
        let result = read(
            "Channel_Name,Panel,Channel,Type\nV1,2,4,Voltage\n",
            DuplicatePolicy::Error,
        );
        assert!(matches!(
            result,
            Err(ChannelListError::ChannelOutOfRange {
                channel: 4,
                width: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_bad_value() {
        let result = read(
            "Channel_Name,Panel,Channel,Type\nTC1,one,0,Temperature\n",
            DuplicatePolicy::Error,
        );
        assert!(matches!(result, Err(ChannelListError::Csv { .. })));
    }

    #[test]
    fn test_duplicates_rejected() {
        let result = read(
            "Channel_Name,Panel,Channel,Type\nTC1,1,0,Temperature\nTC1,1,1,Temperature\n",
            DuplicatePolicy::Error,
        );
        assert!(matches!(
            result,
            Err(ChannelListError::DuplicateName {
                line: 3,
                first_line: 2,
                ..
            })
        ));

        let result = read(
            "Channel_Name,Panel,Channel,Type\nTC1,1,0,Temperature\nTC2,1,0,Temperature\n",
            DuplicatePolicy::Error,
        );
        match result {
            Err(ChannelListError::DuplicateSlot { existing, .. }) => assert_eq!(existing, "TC1"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_duplicates_last_wins() {
        let inputs = read(
            "Channel_Name,Panel,Channel,Type\nTC1,1,0,Temperature\nTC2,1,0,Heat_Flux\nTC2,1,1,Temperature\n",
            DuplicatePolicy::LastWins,
        )
        .unwrap();
        // TC2 first replaced TC1 on channel 0, then moved to channel 1
        assert_eq!(inputs.len(), 1);
        assert!(inputs.get(1, 0).is_none());
        assert_eq!(inputs.get(1, 1).unwrap().name, "TC2");
    }
}
