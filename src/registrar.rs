//! Binding of channel names to handlers for one engine attachment

use std::{collections::HashMap, sync::Arc};

use bevy::ecs::resource::Resource;
use log::debug;

use crate::MethodCallHandler;

/// Handlers registered on an engine attachment, one per channel name.
///
/// Lives as long as the attachment that owns it; a recreated engine starts
/// with an empty set.
#[derive(Resource, Default)]
pub struct MethodChannels {
    handlers: HashMap<String, Arc<dyn MethodCallHandler>>,
}

impl MethodChannels {
    /// Binds `handler` as the exclusive responder for `channel`, silently
    /// replacing any previous binding.
    pub fn register(&mut self, channel: impl Into<String>, handler: impl MethodCallHandler + 'static) {
        self.register_shared(channel, Arc::new(handler));
    }

    /// Same as [`register`](Self::register) for an already shared handler
    pub fn register_shared(&mut self, channel: impl Into<String>, handler: Arc<dyn MethodCallHandler>) {
        let channel = channel.into();
        if self.handlers.insert(channel.clone(), handler).is_some() {
            debug!("Replaced handler on channel `{channel}`");
        } else {
            debug!("Registered handler on channel `{channel}`");
        }
    }

    /// The handler currently bound to `channel`
    pub fn handler_for(&self, channel: &str) -> Option<Arc<dyn MethodCallHandler>> {
        self.handlers.get(channel).cloned()
    }

    /// Whether `channel` has a handler
    pub fn is_registered(&self, channel: &str) -> bool {
        self.handlers.contains_key(channel)
    }

    /// Number of bound channels
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no channel is bound
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
