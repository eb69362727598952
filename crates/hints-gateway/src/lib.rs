//! # Hints Gateway
//!
//! The submissions gateway: fire-and-forget publication and vote
//! submission, retried by the adapter until acknowledgement or
//! cancellation.

pub mod adapters;
pub mod ports;

pub use adapters::{
    InMemorySubmissionsGateway, RetryingSubmissionsGateway, SubmissionTransport,
    SubmittedPublication, SubmittedVote, TransportError,
};
pub use ports::SubmissionsGateway;
