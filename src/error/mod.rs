pub mod pubsub;

pub use pubsub::{
    BusError, BusResult, CorrelationError, PatternError, CORRELATION_ID_MAX_LEN,
    CORRELATION_ID_MIN_LEN,
};
