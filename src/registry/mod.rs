//! Registry access: client adapter and push event stream decoding

pub mod client;
pub mod events;

pub use client::{
    EngineClient, EngineClientBuilder, EventStream, LOGIN_SUCCEEDED, LoginCredentials, LoginStatus,
    PushOptions, RegistryClient,
};
pub use events::{LayerPhase, PushEvent, RawEvent};
