//! Platform-agnostic key tap trait.

use std::sync::Arc;

use crate::error::BridgeError;

/// Payload of a system-defined event (the `NSEvent` subtype and `data1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemDefinedPayload {
    pub subtype: i16,
    pub data1: i64,
}

/// A raw event delivered by the global key tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// Platform event type (`CGEventType` on macOS)
    pub event_type: u32,
    /// System-defined payload, when the platform could decode one
    pub payload: Option<SystemDefinedPayload>,
}

/// What the tap should do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapDisposition {
    /// Swallow the event; the OS never sees it.
    Consume,
    /// Deliver the event unchanged.
    PassThrough,
}

/// Decides the fate of each tapped event. Called synchronously on the tap
/// thread, so it must return quickly.
pub type KeyEventHandler = Arc<dyn Fn(RawKeyEvent) -> TapDisposition + Send + Sync>;

/// Global key interception.
///
/// Implementations deliver events on their own thread and apply the handler's
/// [`TapDisposition`] before the event reaches any application.
pub trait KeyTap: Send {
    /// Install the handler. Must be called before [`enable`](Self::enable).
    fn register(&mut self, handler: KeyEventHandler) -> Result<(), BridgeError>;

    /// Start intercepting events.
    ///
    /// Fails if the platform has no global tap or the required permission
    /// (Accessibility on macOS) is missing.
    fn enable(&mut self) -> Result<(), BridgeError>;

    /// Stop intercepting events. Safe to call when not enabled.
    fn disable(&mut self);

    /// Whether events are currently being intercepted.
    fn is_enabled(&self) -> bool;
}
