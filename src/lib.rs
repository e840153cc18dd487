#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod codec;
pub mod collector;
pub mod config;
pub mod error;
pub mod format;
pub mod identity;
pub mod intercept;
pub mod mediator;
pub mod observability;
pub mod protocol;
pub mod relay;
pub mod verdict;

pub use codec::AttachmentPayload;
pub use collector::{ComposerSurface, GestureOutcome, PromptCollector, SubmitGesture};
pub use config::{MemorySettingsStore, Settings, SettingsStore};
pub use error::{
    ChannelError, CodecError, ConfigError, DispatchError, GuardError, RelayError,
};
pub use identity::{Identity, ensure_identity};
pub use intercept::{
    BinaryPart, GuardedDispatcher, NetworkDispatcher, OutboundRequest, PageCoordinator,
    PendingRegistry, RequestBody, SelectionGesture,
};
pub use mediator::Mediator;
pub use protocol::{DecisionBus, DecisionRequester, SubmissionDescriptor, SubmissionKind};
pub use relay::Relay;
pub use verdict::PolicyDecision;
