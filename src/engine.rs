//! Engine attachment lifecycle and the host application hook
//!
//! An [`Engine`] owns one attachment of the embedded runtime: its method
//! channels, its messenger and its dispatch queue. Recreating the attachment
//! (for example when the activity is recreated) rebuilds all of it, so
//! handlers of the previous attachment never see another call.

use std::sync::Arc;

use bevy::app::App;
use log::{debug, info};

use crate::{
    APP_CHANNEL, BridgeError, BridgePlugin, EmbeddedEndpoint, EmbeddedMessenger, LaunchContext,
    MethodCall, MethodChannels, MethodOutcome, app_dispatcher, codec,
};

/// Trait implemented by the native host application
///
/// `configure_engine` runs once per engine attachment, before any call is
/// dispatched, and is where channels get their handlers.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use webspace_host::prelude::*;
///
/// struct MyHost;
///
/// impl HostApp for MyHost {
///     fn configure_engine(channels: &mut MethodChannels, launch: &Arc<LaunchContext>) {
///         channels.register(APP_CHANNEL, app_dispatcher(launch.clone()));
///     }
/// }
///
/// export_host_app!(MyHost);
/// ```
pub trait HostApp {
    /// Register the handlers of this attachment
    fn configure_engine(channels: &mut MethodChannels, launch: &Arc<LaunchContext>);

    /// Optional: Called before the attachment's app is created
    fn pre_init() {}

    /// Optional: Called after the bridge plugin is added but before
    /// `configure_engine`
    fn post_init(_app: &mut App) {}
}

/// The Webspace host: serves [`APP_CHANNEL`] with the application dispatcher
pub struct WebspaceHost;

impl HostApp for WebspaceHost {
    fn configure_engine(channels: &mut MethodChannels, launch: &Arc<LaunchContext>) {
        channels.register(APP_CHANNEL, app_dispatcher(launch.clone()));
    }
}

/// One attachment of the embedded runtime to the host
pub struct Engine {
    app: App,
    messenger: Arc<EmbeddedMessenger>,
    launch: Arc<LaunchContext>,
    build: fn(&Arc<LaunchContext>) -> App,
}

impl Engine {
    /// Builds an attachment configured by `A`
    pub fn attach<A: HostApp>(launch: LaunchContext) -> Self {
        let launch = Arc::new(launch);
        let app = build_app::<A>(&launch);
        let messenger = app.world().resource::<EmbeddedEndpoint>().0.clone();

        info!("Engine attached with {} launch extras", launch.len());
        Self {
            app,
            messenger,
            launch,
            build: build_app::<A>,
        }
    }

    /// Tears the attachment down and builds a fresh one from the same launch
    /// context. Messengers taken from the old attachment become disconnected.
    pub fn recreate(&mut self) {
        debug!("Recreating engine attachment");
        self.app = (self.build)(&self.launch);
        self.messenger = self.app.world().resource::<EmbeddedEndpoint>().0.clone();
    }

    /// The embedded runtime's end of the messenger.
    ///
    /// Every clone shares one reply queue: replies a caller does not collect
    /// are kept until someone drains them, so callers must take the replies
    /// of the messages they send.
    pub fn messenger(&self) -> Arc<EmbeddedMessenger> {
        self.messenger.clone()
    }

    /// Launch context of this attachment
    pub fn launch(&self) -> &LaunchContext {
        self.app.world().resource::<LaunchContext>()
    }

    /// Handlers bound on this attachment
    pub fn channels(&self) -> &MethodChannels {
        self.app.world().resource::<MethodChannels>()
    }

    /// Mutable access to the handlers, for hosts that rebind at runtime
    pub fn channels_mut(&mut self) -> bevy::ecs::change_detection::Mut<'_, MethodChannels> {
        self.app.world_mut().resource_mut::<MethodChannels>()
    }

    /// Runs the dispatch queue once, serving every pending message
    pub fn pump(&mut self) {
        self.app.update();
    }

    /// Sends an encoded call and returns the encoded reply
    pub fn send_raw(&mut self, channel: &str, payload: Vec<u8>) -> Result<Vec<u8>, BridgeError> {
        let reply_id = self.messenger.send(channel, payload)?;
        self.pump();
        self.messenger
            .reply_for(reply_id)?
            .map(|reply| reply.payload)
            .ok_or(BridgeError::NoReply(reply_id))
    }

    /// Issues `call` on `channel` and waits for its outcome
    pub fn invoke(&mut self, channel: &str, call: &MethodCall) -> Result<MethodOutcome, BridgeError> {
        let reply = self.send_raw(channel, codec::encode_call(call)?)?;
        codec::decode_outcome(&reply)
    }
}

fn build_app<A: HostApp>(launch: &Arc<LaunchContext>) -> App {
    A::pre_init();

    let mut app = App::new();
    app.add_plugins(BridgePlugin::new(launch.clone()));

    A::post_init(&mut app);

    {
        let mut channels = app.world_mut().resource_mut::<MethodChannels>();
        A::configure_engine(&mut channels, launch);
    }

    app.finish();
    app.cleanup();
    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEMO_MODE_KEY, GET_DEMO_MODE};

    #[test]
    fn webspace_host_serves_demo_mode() {
        let mut engine =
            Engine::attach::<WebspaceHost>(LaunchContext::new().with_extra(DEMO_MODE_KEY, true));
        assert!(engine.channels().is_registered(APP_CHANNEL));
        assert!(engine.launch().get_bool(DEMO_MODE_KEY, false));

        let outcome = engine.invoke(APP_CHANNEL, &MethodCall::bare(GET_DEMO_MODE));
        assert_eq!(outcome.unwrap(), MethodOutcome::success(true));
    }

    #[test]
    fn recreate_disconnects_old_messenger() {
        let mut engine = Engine::attach::<WebspaceHost>(LaunchContext::new());
        let stale = engine.messenger();

        engine.recreate();

        assert!(matches!(
            stale.send(APP_CHANNEL, Vec::new()),
            Err(BridgeError::Disconnected)
        ));
        assert!(!Arc::ptr_eq(&stale, &engine.messenger()));
        assert_eq!(
            engine
                .invoke(APP_CHANNEL, &MethodCall::bare(GET_DEMO_MODE))
                .unwrap(),
            MethodOutcome::success(false)
        );
    }
}
