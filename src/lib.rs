/// Configuration loading from the environment.
pub mod config;
/// Common error types: topic patterns, correlation ids, bus operations.
pub mod error;
/// Flexible logging on top of tracing.
pub mod logging;
/// Pub/Sub: PubSub bus, aggregator, scoped singleton registry.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::Settings;
/// Operation errors and result types.
pub use error::{BusError, BusResult, CorrelationError, PatternError};
/// Pub/Sub API.
pub use pubsub::{
    is_valid_correlation_id, validate_correlation_id, validate_topic, BusConfig, Message, Payload,
    PubSub, PubSubAggregator, PubSubSolo, PublishOptions, TopicPattern, MATCH_ALL_TOPICS,
    MATCH_ANY_CORRELATION,
};
