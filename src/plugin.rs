//! Bridge plugin wiring the method channels into an engine attachment

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use bevy::{
    app::{App, Plugin, PreUpdate},
    ecs::{resource::Resource, system::Res},
};
use log::{debug, warn};

use crate::{
    EmbeddedMessenger, HostChannel, LaunchContext, MethodChannels, PlatformMessage, codec,
};

/// Plugin that turns an [`App`] into an engine attachment serving method
/// channels.
///
/// Inserts the launch context, an empty [`MethodChannels`] set and a fresh
/// messenger pair, then drains incoming messages once per update in
/// [`PreUpdate`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bevy::app::App;
/// use webspace_host::{APP_CHANNEL, BridgePlugin, LaunchContext, MethodChannels, app_dispatcher};
///
/// let launch = Arc::new(LaunchContext::new().with_extra("DEMO_MODE", true));
/// let mut app = App::new();
/// app.add_plugins(BridgePlugin::new(launch.clone()));
/// app.world_mut()
///     .resource_mut::<MethodChannels>()
///     .register(APP_CHANNEL, app_dispatcher(launch));
/// ```
pub struct BridgePlugin {
    launch: Arc<LaunchContext>,
}

impl BridgePlugin {
    /// Creates the plugin for an instance started with `launch`
    pub fn new(launch: Arc<LaunchContext>) -> Self {
        Self { launch }
    }
}

/// Resource holding the embedded runtime's end of this attachment's messenger
#[derive(Resource, Clone)]
pub struct EmbeddedEndpoint(
    /// Shared messenger handle
    pub Arc<EmbeddedMessenger>,
);

impl Plugin for BridgePlugin {
    fn name(&self) -> &str {
        "webspace_host::BridgePlugin"
    }

    fn build(&self, app: &mut App) {
        let (host, messenger) = HostChannel::pair();

        app.insert_resource(LaunchContext::clone(&self.launch))
            .insert_resource(host)
            .insert_resource(EmbeddedEndpoint(Arc::new(messenger)))
            .init_resource::<MethodChannels>()
            .add_systems(PreUpdate, dispatch_platform_messages);
    }
}

/// Serves every pending message in issue order, one at a time, replying
/// exactly once to each.
fn dispatch_platform_messages(host: Res<HostChannel>, channels: Res<MethodChannels>) {
    while let Some(message) = host.receive() {
        let reply_id = message.reply_id;
        let payload = dispatch_message(&channels, &message);
        host.reply(crate::PlatformReply { reply_id, payload });
    }
}

/// Resolves one message to its encoded reply.
///
/// Unknown channels, undecodable calls and panicking handlers get an empty
/// (not-implemented) reply so the caller is never left waiting. Handler
/// panics are recorded in the last-error slot.
pub fn dispatch_message(channels: &MethodChannels, message: &PlatformMessage) -> Vec<u8> {
    let Some(handler) = channels.handler_for(&message.channel) else {
        debug!(
            "No handler on channel `{}` for message {}",
            message.channel, message.reply_id
        );
        return Vec::new();
    };

    let call = match codec::decode_call(&message.payload) {
        Ok(call) => call,
        Err(e) => {
            warn!(
                "Dropping undecodable call {} on `{}`: {}",
                message.reply_id, message.channel, e
            );
            return Vec::new();
        }
    };

    debug!("Dispatching `{}` on `{}`", call.method, message.channel);
    match catch_unwind(AssertUnwindSafe(|| handler.handle(&call))) {
        Ok(outcome) => codec::encode_outcome(&outcome),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            crate::ffi::store_error(format!(
                "Handler for `{}` on `{}` panicked: {}",
                call.method, message.channel, reason
            ));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{APP_CHANNEL, MethodCall, MethodOutcome, app_dispatcher};

    fn message(channel: &str, payload: &[u8]) -> PlatformMessage {
        PlatformMessage {
            channel: channel.to_owned(),
            reply_id: 7,
            payload: payload.to_vec(),
        }
    }

    fn app_channels(launch: LaunchContext) -> MethodChannels {
        let mut channels = MethodChannels::default();
        channels.register(APP_CHANNEL, app_dispatcher(Arc::new(launch)));
        channels
    }

    #[test]
    fn unknown_channel_gets_empty_reply() {
        let channels = app_channels(LaunchContext::new());
        let reply = dispatch_message(&channels, &message("other", br#"{"method":"getDemoMode"}"#));
        assert!(reply.is_empty());
    }

    #[test]
    fn undecodable_call_gets_empty_reply() {
        let channels = app_channels(LaunchContext::new());
        assert!(dispatch_message(&channels, &message(APP_CHANNEL, b"\xff\x00")).is_empty());
    }

    #[test]
    fn panicking_handler_gets_empty_reply() {
        let mut channels = MethodChannels::default();
        channels.register(APP_CHANNEL, |_: &MethodCall| -> MethodOutcome {
            panic!("handler fault")
        });

        let reply = dispatch_message(&channels, &message(APP_CHANNEL, br#"{"method":"getDemoMode"}"#));
        assert!(reply.is_empty());
    }

    #[test]
    fn known_call_is_encoded() {
        let channels = app_channels(LaunchContext::new().with_extra("DEMO_MODE", true));
        let reply = dispatch_message(&channels, &message(APP_CHANNEL, br#"{"method":"getDemoMode"}"#));
        assert_eq!(
            codec::decode_outcome(&reply).unwrap(),
            MethodOutcome::success(true)
        );
    }

    #[test]
    fn system_replies_once_per_message() {
        let launch = Arc::new(LaunchContext::new());
        let mut app = App::new();
        app.add_plugins(BridgePlugin::new(launch.clone()));
        app.world_mut()
            .resource_mut::<MethodChannels>()
            .register(APP_CHANNEL, app_dispatcher(launch));
        app.finish();
        app.cleanup();

        let messenger = app.world().resource::<EmbeddedEndpoint>().0.clone();
        let call = codec::encode_call(&MethodCall::bare("getDemoMode")).unwrap();
        let first = messenger.send(APP_CHANNEL, call.clone()).unwrap();
        let second = messenger.send(APP_CHANNEL, call).unwrap();

        app.update();

        assert_eq!(messenger.try_reply().unwrap().map(|r| r.reply_id), Some(first));
        assert_eq!(messenger.try_reply().unwrap().map(|r| r.reply_id), Some(second));
        assert_eq!(messenger.try_reply().unwrap(), None);
    }
}
