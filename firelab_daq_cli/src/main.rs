use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use libfirelab_daq::config::Config;
use libfirelab_daq::error::ConfigError;
use libfirelab_daq::process::{process, process_reduction};
use libfirelab_daq::status::ProcessStatus;

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn update_bar(pb: &ProgressBar, status: ProcessStatus) {
    pb.set_message(format!("{}: {}", status.stage.as_str(), status.file_name));
    pb.set_position((status.progress * 100.0) as u64);
}

fn main() {
    // Create a cli
    let matches = Command::new("firelab_daq_cli")
        .about("Generate DAQ channel configurations and reduce fire test data")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("reduce").about("Reduce the test data named in the configuration"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        std::process::exit(1);
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            log::error!("A configuration path is required");
            std::process::exit(1);
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        if let Err(e) = make_template_config(&config_path) {
            log::error!("Could not write template config: {e}");
            std::process::exit(1);
        }
        log::info!("Done.");
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("System ID: {}", config.system_id);
    log::info!(
        "Channel list directory: {}",
        config.channel_list_dir.to_string_lossy()
    );
    log::info!("Panels: {}", config.panel_defs.len());
    log::info!("Duplicate policy: {:?}", config.duplicates);
    log::info!(
        "Hardware config: {}",
        if config.need_hardware_config() {
            "enabled"
        } else {
            "disabled"
        }
    );

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let failed = match matches.subcommand() {
        Some(("reduce", _)) => {
            if let Some(reduction) = &config.reduction {
                log::info!("Data directory: {}", reduction.data_dir.to_string_lossy());
                log::info!("Output directory: {}", reduction.output_dir.to_string_lossy());
            }
            match process_reduction(&config, |status| update_bar(&pb, status)) {
                Ok(written) => {
                    log::info!("Successfully wrote {} reduction outputs!", written.len());
                    false
                }
                Err(e) => {
                    log::error!("Reduction failed with error: {e}");
                    true
                }
            }
        }
        _ => match process(&config, |status| update_bar(&pb, status)) {
            Ok(summary) => {
                log::info!(
                    "Successfully wrote {} channel configs!",
                    summary.channel_configs.len()
                );
                false
            }
            Err(e) => {
                log::error!("Generating channel configs failed with error: {e}");
                true
            }
        },
    };

    pb.finish();

    if failed {
        std::process::exit(1);
    }
    log::info!("Done.");
}
