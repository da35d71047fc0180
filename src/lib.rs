//! Native host bridge for the Webspace application shell
//!
//! The host container owns launch parameters that the embedded runtime cannot
//! read on its own. This crate lets the embedded layer reach them through
//! named method channels: the host binds one handler per channel, and every
//! call gets back exactly one outcome, either a value or an explicit
//! not-implemented marker.
//!
//! # Architecture
//!
//! - **LaunchContext**: read-only intent extras / launch arguments
//! - **MethodDispatcher**: method-name table resolving calls to accessors
//! - **MethodChannels**: channel-name registry, one handler per channel
//! - **BridgePlugin**: drains the messenger in `PreUpdate`, one call at a time
//! - **Engine**: owns one attachment and rebuilds it on recreation
//! - Provides FFI (C ABI and JNI) for platform hosts

#![warn(missing_docs)]

mod call;
mod channel;
pub mod codec;
mod dispatcher;
mod engine;
mod error;
pub mod ffi;
mod launch;
mod plugin;
mod registrar;

#[cfg(target_os = "android")]
pub mod android;

pub use call::*;
pub use channel::*;
pub use dispatcher::*;
pub use engine::*;
pub use error::*;
pub use launch::*;
pub use plugin::*;
pub use registrar::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        APP_CHANNEL, BridgeError, DEMO_MODE_KEY, Engine, GET_DEMO_MODE, HostApp, LaunchContext,
        MethodCall, MethodCallHandler, MethodChannels, MethodDispatcher, MethodOutcome,
        WebspaceHost, app_dispatcher, export_host_app,
    };

    #[cfg(target_os = "android")]
    pub use crate::android::*;
}
