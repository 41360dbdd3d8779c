use std::path::{Path, PathBuf};

use super::channel_list::load_channel_list;
use super::charts::write_test_charts;
use super::chcfg::{build_channel_records, emit_chcfg_file};
use super::config::{get_chcfg_path, Config, DuplicatePolicy};
use super::error::{ProcessorError, ReductionError};
use super::hardware_config::emit_hardware_config_file;
use super::layout::PanelLayout;
use super::output::write_file_atomically;
use super::reduction::Reducer;
use super::status::{ProcessStatus, Stage};
use super::test_data::TestData;

/// Files written by a run of [`process`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSummary {
    pub hardware_config: Option<PathBuf>,
    pub channel_configs: Vec<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Convert one channel list into its `.chcfg`, returning the path written
pub fn process_channel_list(
    path: &Path,
    layout: &PanelLayout,
    policy: DuplicatePolicy,
) -> Result<PathBuf, ProcessorError> {
    let active = load_channel_list(path, layout, policy)?;
    let records = build_channel_records(layout, &active);
    let chcfg_path = get_chcfg_path(path);
    emit_chcfg_file(&chcfg_path, &records)?;
    log::info!(
        "Wrote {} ({} channels, {} active)",
        chcfg_path.display(),
        records.len(),
        active.len()
    );
    Ok(chcfg_path)
}

/// The main loop of the channel configuration generator.
///
/// Writes the hardware configuration (when enabled) and then one `.chcfg` per channel list,
/// in name order. `on_status` is called after every file. The first failing file stops the
/// run; files written before it are kept.
pub fn process(
    config: &Config,
    mut on_status: impl FnMut(ProcessStatus),
) -> Result<ProcessSummary, ProcessorError> {
    let layout = config.panel_layout()?;
    let mut summary = ProcessSummary::default();

    if config.need_hardware_config() {
        let hw_path = config.get_hardware_config_path();
        log::info!("Writing hardware config {}...", hw_path.display());
        emit_hardware_config_file(&hw_path, &layout, &config.hardware_config)?;
        on_status(ProcessStatus::new(1.0, &file_name(&hw_path), Stage::HardwareConfig));
        summary.hardware_config = Some(hw_path);
    }

    let lists = config.get_channel_list_files()?;
    if lists.is_empty() {
        log::warn!(
            "No channel lists found in {}",
            config.channel_list_dir.display()
        );
    }
    let total = lists.len();
    for (idx, list) in lists.iter().enumerate() {
        log::info!("Processing channel list {}...", list.display());
        let written = process_channel_list(list, &layout, config.duplicates)?;
        summary.channel_configs.push(written);
        on_status(ProcessStatus::new(
            (idx + 1) as f32 / total as f32,
            &file_name(list),
            Stage::ChannelConfig,
        ));
    }
    Ok(summary)
}

/// Get the test data files of the reduction, sorted by name. The reduction channel list and
/// test description are skipped if they live in the same directory
fn get_test_data_files(config: &Config) -> Result<Vec<PathBuf>, ProcessorError> {
    let reduction = config
        .reduction
        .as_ref()
        .ok_or(ProcessorError::NoReductionConfig)?;
    if !reduction.data_dir.is_dir() {
        return Err(ProcessorError::BadDirectory(reduction.data_dir.clone()));
    }
    let mut files: Vec<PathBuf> = Vec::new();
    for item in reduction.data_dir.read_dir()? {
        let path = item?.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv
            || path == reduction.channel_list
            || Some(&path) == reduction.test_description.as_ref()
        {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Reduce every test data file in the data directory.
///
/// Writes `<test>_reduced.csv` and `<test>_stats.csv` to the output directory for each test,
/// plus `<test>/<chart>.svg` per chart group when charts are enabled, and returns the paths
/// written.
pub fn process_reduction(
    config: &Config,
    mut on_status: impl FnMut(ProcessStatus),
) -> Result<Vec<PathBuf>, ProcessorError> {
    let reduction = config
        .reduction
        .as_ref()
        .ok_or(ProcessorError::NoReductionConfig)?;
    let files = get_test_data_files(config)?;
    std::fs::create_dir_all(&reduction.output_dir)?;

    let reducer = Reducer::from_config(reduction)?;
    log::info!(
        "Loaded {} reduction channels from {}",
        reducer.channels().len(),
        reduction.channel_list.display()
    );

    let mut written: Vec<PathBuf> = Vec::new();
    let total = files.len();
    for (idx, file) in files.iter().enumerate() {
        log::info!("Reducing {}...", file.display());
        let data = TestData::read(file).map_err(ReductionError::from)?;
        let reduced = reducer.reduce(&data)?;

        let reduced_path = reduction
            .output_dir
            .join(format!("{}_reduced.csv", reduced.test_name));
        write_file_atomically(&reduced_path, |w| reduced.write_reduced_csv(w))?;
        let stats_path = reduction
            .output_dir
            .join(format!("{}_stats.csv", reduced.test_name));
        write_file_atomically(&stats_path, |w| reduced.write_stats_csv(w))?;

        log::info!(
            "Wrote {} and {}",
            reduced_path.display(),
            stats_path.display()
        );
        written.push(reduced_path);
        written.push(stats_path);
        if reduction.charts {
            let chart_dir = reduction.output_dir.join(&reduced.test_name);
            written.extend(write_test_charts(&chart_dir, &reduced)?);
        }
        on_status(ProcessStatus::new(
            (idx + 1) as f32 / total as f32,
            &file_name(file),
            Stage::Reduction,
        ));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PanelDef, ReductionConfig};
    use crate::error::ChannelListError;
    use crate::output::partial_path;
    use crate::sensor_type::SensorType;
    use std::collections::BTreeMap;

    fn config(dir: &Path) -> Config {
        Config {
            channel_list_dir: dir.to_path_buf(),
            system_id: String::from("SYS1"),
            panel_defs: BTreeMap::from([(1, PanelDef::new(2, SensorType::Temperature))]),
            panel_chans: BTreeMap::from([(1, [0, 2])]),
            reduction: None,
            ..Config::default()
        }
    }

    #[test]
    fn test_process_channel_lists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("B_channel_list.csv"),
            "Channel_Name,Panel,Channel,Type\nTC1,1,1,Temperature\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("A_Channel_List.csv"), "").unwrap();
        std::fs::write(dir.path().join("notes.csv"), "not a channel list").unwrap();

        let mut config = config(dir.path());
        config.hardware_config.enabled = true;

        let mut statuses: Vec<ProcessStatus> = Vec::new();
        let summary = process(&config, |s| statuses.push(s)).unwrap();

        assert_eq!(
            summary.hardware_config,
            Some(dir.path().join("SYS1_configData.txt"))
        );
        assert_eq!(
            summary.channel_configs,
            vec![
                dir.path().join("A_Channel_List.chcfg"),
                dir.path().join("B_channel_list.chcfg")
            ]
        );
        assert!(!dir.path().join("notes.chcfg").exists());

        let chcfg = std::fs::read_to_string(dir.path().join("B_channel_list.chcfg")).unwrap();
        assert!(chcfg.contains("\"TC1\""));
        assert!(chcfg.contains("SYS1Slot2/ai1"));
        let hw = std::fs::read_to_string(dir.path().join("SYS1_configData.txt")).unwrap();
        assert!(hw.contains("Pan01Ch01\t"));

        let stages: Vec<Stage> = statuses.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![Stage::HardwareConfig, Stage::ChannelConfig, Stage::ChannelConfig]
        );
        assert_eq!(statuses[2].progress, 1.0);
        assert_eq!(statuses[2].file_name, "B_channel_list.csv");
    }

    #[test]
    fn test_failed_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("A_channel_list.csv"),
            "Channel_Name,Panel,Channel,Type\nTC1,1,0,Temperature\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("B_channel_list.csv"),
            "Channel_Name,Panel,Channel,Type\nTC1,1,0,Temperature\nTC2,4,0,Temperature\n",
        )
        .unwrap();

        let result = process(&config(dir.path()), |_| ());
        match result {
            Err(ProcessorError::ChannelListError(ChannelListError::UnknownPanel {
                line,
                panel,
                ..
            })) => {
                assert_eq!(line, 3);
                assert_eq!(panel, 4);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(dir.path().join("A_channel_list.chcfg").exists());
        let failed = dir.path().join("B_channel_list.chcfg");
        assert!(!failed.exists());
        assert!(!partial_path(&failed).exists());
    }

    #[test]
    fn test_process_reduction() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let channel_list = data_dir.join("reduction_channels.csv");
        std::fs::write(
            &channel_list,
            "Channel_Name,Type,Scale,Offset,Chart,Label\nTC1,Temperature,,,Temps,TC 1\n",
        )
        .unwrap();
        std::fs::write(
            data_dir.join("Test_7.csv"),
            "Test Name,Test_7
Engineer,
Location,
Test Info,


Time,TC1,Event
00:00:01,10.0,
00:00:02,20.0,Ignition
00:00:03,30.0,
00:00:04,40.0,
00:00:05,50.0,
",
        )
        .unwrap();

        let mut config = config(dir.path());
        config.reduction = Some(ReductionConfig {
            channel_list,
            data_dir,
            output_dir: dir.path().join("out"),
            moving_average_window: 3,
            ..ReductionConfig::default()
        });

        let mut statuses: Vec<ProcessStatus> = Vec::new();
        let written = process_reduction(&config, |s| statuses.push(s)).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("out/Test_7_reduced.csv"),
                dir.path().join("out/Test_7_stats.csv"),
                dir.path().join("out/Test_7/Temps.svg")
            ]
        );
        assert_eq!(statuses.len(), 1);

        let reduced = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(reduced, "Time,TC1,Event\n0,20,Ignition\n1,30,\n2,40,\n");
        let stats = std::fs::read_to_string(&written[1]).unwrap();
        assert_eq!(stats, "Channel,Label,Max,Min,Mean\nTC1,TC 1,40,20,30\n");
        let chart = std::fs::read_to_string(&written[2]).unwrap();
        assert!(chart.contains("TC 1"));
        assert!(chart.contains("Ignition"));

        let out = dir.path().join("out");
        std::fs::remove_dir_all(&out).unwrap();
        if let Some(reduction) = config.reduction.as_mut() {
            reduction.charts = false;
        }
        let written = process_reduction(&config, |_| ()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(!out.join("Test_7").exists());
    }

    #[test]
    fn test_reduction_needs_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_reduction(&config(dir.path()), |_| ());
        assert!(matches!(result, Err(ProcessorError::NoReductionConfig)));

        let mut config = config(dir.path());
        config.reduction = Some(ReductionConfig {
            data_dir: dir.path().join("missing"),
            ..ReductionConfig::default()
        });
        let result = process_reduction(&config, |_| ());
        assert!(matches!(result, Err(ProcessorError::BadDirectory(_))));
    }
}
