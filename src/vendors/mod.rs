//! Built-in vendor transcoders, one module per platform.

pub mod bland;
pub mod livekit;
pub mod retell;
pub mod survey;
pub mod vapi;

pub use bland::BlandTranscoder;
pub use livekit::LiveKitTranscoder;
pub use retell::{RetellFlowTranscoder, RetellLlmTranscoder};
pub use survey::SurveyTranscoder;
pub use vapi::VapiTranscoder;
