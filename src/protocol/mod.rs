pub mod channel;
pub mod frames;

pub use channel::{DEFAULT_DECISION_TIMEOUT, DecisionBus, DecisionRequester};
pub use frames::{Frame, RequestFrame, ResponseFrame, SubmissionDescriptor, SubmissionKind};
