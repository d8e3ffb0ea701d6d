// Shared logger init for both binaries (SPEC_FULL.md §1). Colored level
// on stdout, plain text in a daily-rotated file under `log_dir`.

use std::path::Path;

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

pub fn init(level: LevelFilter, log_dir: &Path, disable_color: bool, disable_file: bool) -> anyhow::Result<()> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut dispatch = fern::Dispatch::new().level(level);

    let stdout_format = fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = if disable_color {
                record.level().to_string()
            } else {
                colors.color(record.level()).to_string()
            };
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                level,
                record.target(),
                message
            ))
        })
        .chain(std::io::stdout());

    dispatch = dispatch.chain(stdout_format);

    if !disable_file {
        std::fs::create_dir_all(log_dir)?;
        let file_format = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(fern::DateBased::new(log_dir, "besuscan.%Y-%m-%d.log"));
        dispatch = dispatch.chain(file_format);
    }

    dispatch.apply()?;
    Ok(())
}
