use log::LevelFilter;

pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;
