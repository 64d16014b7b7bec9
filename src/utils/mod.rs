mod maths_utils;
mod perf;
mod time_utils;

pub use time_utils::{
    TimeUtils, epoch_ms_to_filename_stamp, epoch_ms_to_utc, format_duration, now_timestamp_ms,
    parse_utc_datetime,
};

pub(crate) use maths_utils::{duration_to_candles, mean_and_stddev, median, population_beta};
