// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Log module, reference
//! https://docs.rs/log4rs

use crate::error::DeckResult;
use log::LevelFilter;

#[cfg(feature = "log4rs")]
use crate::error::DeckError;
#[cfg(feature = "log4rs")]
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

/// init logs system, writing to `file_path`
pub fn init_log(level: LevelFilter, file_path: &str) -> DeckResult<()> {
    #[cfg(feature = "log4rs")]
    {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} {l} {t} {m}{n}",
            )))
            .build(file_path)
            .map_err(|e| DeckError::Config(format!("log file {}: {}", file_path, e)))?;
        let config = Config::builder()
            .appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(level)))
                    .build("logfile", Box::new(logfile)),
            )
            .build(Root::builder().appender("logfile").build(level))
            .map_err(|e| DeckError::Config(e.to_string()))?;
        log4rs::init_config(config).map_err(|e| DeckError::Config(e.to_string()))?;
    }
    #[cfg(not(feature = "log4rs"))]
    {
        let _ = (level, file_path);
        log::set_max_level(level);
    }
    Ok(())
}
