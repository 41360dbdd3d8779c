use std::collections::BTreeMap;
use std::ops::Range;

use super::config::PanelDef;
use super::error::LayoutError;
use super::sensor_type::SensorType;

/// One validated panel of the DAQ.
///
/// A panel owns the device channels `channel_start..channel_end` on the device in `slot`.
/// Channels inside the panel are addressed by their in-panel index `0..width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub number: u32,
    pub slot: u32,
    pub default_type: SensorType,
    pub channel_start: u32,
    pub channel_end: u32,
}

impl Panel {
    /// Number of physical channels owned by the panel
    pub fn width(&self) -> u32 {
        self.channel_end - self.channel_start
    }

    pub fn device_channels(&self) -> Range<u32> {
        self.channel_start..self.channel_end
    }

    /// Physical channel name of an in-panel index, e.g. `PXI1Slot8/ai33`
    pub fn physical_channel(&self, system_id: &str, in_panel_index: u32) -> String {
        format!(
            "{system_id}Slot{}/ai{}",
            self.slot,
            in_panel_index + self.channel_start
        )
    }

    /// Label used for channels without a name, e.g. `Pan07Ch03`
    pub fn synthesized_label(&self, in_panel_index: u32) -> String {
        format!("Pan{:02}Ch{:02}", self.number, in_panel_index)
    }
}

/// The panel topology of a DAQ system, ordered by panel number.
///
/// Built from the `panel_defs` and `panel_chans` maps of the [`Config`](crate::config::Config);
/// both maps must name exactly the same panels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLayout {
    system_id: String,
    panels: Vec<Panel>,
}

impl PanelLayout {
    pub fn new(
        system_id: &str,
        panel_defs: &BTreeMap<u32, PanelDef>,
        panel_chans: &BTreeMap<u32, [u32; 2]>,
    ) -> Result<Self, LayoutError> {
        if system_id.trim().is_empty() {
            return Err(LayoutError::EmptySystemId);
        }
        if panel_defs.is_empty() {
            return Err(LayoutError::NoPanels);
        }
        if let Some(number) = panel_chans.keys().find(|n| !panel_defs.contains_key(n)) {
            return Err(LayoutError::MissingDefinition(*number));
        }

        let mut panels: Vec<Panel> = Vec::with_capacity(panel_defs.len());
        for (number, def) in panel_defs.iter() {
            let [start, end] = match panel_chans.get(number) {
                Some(range) => *range,
                None => return Err(LayoutError::MissingRange(*number)),
            };
            if end < start {
                return Err(LayoutError::BadRange {
                    panel: *number,
                    start,
                    end,
                });
            }
            panels.push(Panel {
                number: *number,
                slot: def.slot,
                default_type: def.default_type,
                channel_start: start,
                channel_end: end,
            });
        }

        // Two panels on one device cannot share device channels
        for (idx, first) in panels.iter().enumerate() {
            for second in panels[idx + 1..].iter() {
                if first.slot == second.slot
                    && first.width() > 0
                    && second.width() > 0
                    && first.channel_start < second.channel_end
                    && second.channel_start < first.channel_end
                {
                    return Err(LayoutError::OverlappingChannels {
                        first: first.number,
                        second: second.number,
                        slot: first.slot,
                    });
                }
            }
        }

        Ok(Self {
            system_id: system_id.to_string(),
            panels,
        })
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, number: u32) -> Option<&Panel> {
        self.panels.iter().find(|p| p.number == number)
    }

    /// Sum of the panel widths; the number of channel blocks in every `.chcfg`
    pub fn total_channels(&self) -> usize {
        self.panels.iter().map(|p| p.width() as usize).sum()
    }
}
