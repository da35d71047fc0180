//! Native host library for the Webspace iOS and Android apps

use std::sync::{Arc, Once};

use bevy::{
    app::App,
    log::{Level, LogPlugin},
};
use log::info;
use webspace_host::{export_host_app, prelude::*};

/// The logger is process-wide, while `post_init` runs for every attachment
static LOGGING: Once = Once::new();

/// The Webspace host as linked into the mobile apps
struct MobileHost;

impl HostApp for MobileHost {
    fn post_init(app: &mut App) {
        LOGGING.call_once(|| {
            app.add_plugins(LogPlugin {
                level: Level::DEBUG,
                filter: "webspace_host=debug,webspace_mobile_host=debug".to_string(),
                ..Default::default()
            });
        });
    }

    fn configure_engine(channels: &mut MethodChannels, launch: &Arc<LaunchContext>) {
        WebspaceHost::configure_engine(channels, launch);
        info!(
            "Configured {} channel(s), demo mode {}",
            channels.len(),
            launch.get_bool(DEMO_MODE_KEY, false)
        );
    }
}

// Export the FFI entry points
export_host_app!(MobileHost);
