//! Streaming voice-session media layer.

pub mod facade;

pub use facade::{
    CredentialSource, FacadeState, SpeechEvent, StreamingCall, StreamingFacade,
    StreamingTransport,
};
