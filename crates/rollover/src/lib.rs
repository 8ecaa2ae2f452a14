pub mod engine;
pub mod error;
pub mod headers;
pub mod layout;

pub use engine::{PeriodState, RolloverEngine, DEFAULT_MAX_PERIODS_PER_RUN};
pub use error::RolloverError;
pub use headers::{find_headers, header_category, PeriodHeader};
pub use layout::{IncomeLine, TrackingLayout};
