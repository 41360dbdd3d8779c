/// The step of the processing a status update belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    HardwareConfig,
    ChannelConfig,
    Reduction,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardwareConfig => "hardware config",
            Self::ChannelConfig => "channel configs",
            Self::Reduction => "reduction",
        }
    }
}

/// Progress report sent after each file is handled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessStatus {
    /// Fraction of the stage completed, 0.0 to 1.0
    pub progress: f32,
    pub file_name: String,
    pub stage: Stage,
}

impl ProcessStatus {
    pub fn new(progress: f32, file_name: &str, stage: Stage) -> Self {
        Self {
            progress,
            file_name: file_name.to_string(),
            stage,
        }
    }
}
