//! Resolution of method calls to host-side accessors

use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{LaunchContext, MethodCall, MethodOutcome};

/// Channel shared verbatim with the embedded runtime
pub const APP_CHANNEL: &str = "app.channel";

/// Method returning whether the instance was launched in demo mode
pub const GET_DEMO_MODE: &str = "getDemoMode";

/// Launch extra holding the demo-mode flag
pub const DEMO_MODE_KEY: &str = "DEMO_MODE";

/// Anything that can answer calls arriving on a channel
pub trait MethodCallHandler: Send + Sync {
    /// Produces the single outcome for `call`
    fn handle(&self, call: &MethodCall) -> MethodOutcome;
}

impl<F> MethodCallHandler for F
where
    F: Fn(&MethodCall) -> MethodOutcome + Send + Sync,
{
    fn handle(&self, call: &MethodCall) -> MethodOutcome {
        self(call)
    }
}

type MethodFn = Box<dyn Fn(&MethodCall, &LaunchContext) -> MethodOutcome + Send + Sync>;

/// Table-driven dispatcher: one lookup by exact method name per call.
///
/// Holds no per-call state. The launch context is injected at construction
/// so the table can be exercised against a fake context.
pub struct MethodDispatcher {
    launch: Arc<LaunchContext>,
    methods: HashMap<String, MethodFn>,
}

impl MethodDispatcher {
    /// Creates a dispatcher that recognizes no methods yet
    pub fn new(launch: Arc<LaunchContext>) -> Self {
        Self {
            launch,
            methods: HashMap::new(),
        }
    }

    /// Adds (or replaces) the accessor for `name`
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&MethodCall, &LaunchContext) -> MethodOutcome + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }

    /// Whether `name` is in the table
    pub fn recognizes(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Resolves and runs the call. Unknown methods yield
    /// [`MethodOutcome::NotImplemented`].
    pub fn handle(&self, call: &MethodCall) -> MethodOutcome {
        match self.methods.get(call.method.as_str()) {
            Some(method) => method(call, self.launch.as_ref()),
            None => {
                debug!("No accessor for method `{}`", call.method);
                MethodOutcome::NotImplemented
            }
        }
    }
}

impl MethodCallHandler for MethodDispatcher {
    fn handle(&self, call: &MethodCall) -> MethodOutcome {
        MethodDispatcher::handle(self, call)
    }
}

/// Builds the dispatcher serving the application's method set
pub fn app_dispatcher(launch: Arc<LaunchContext>) -> MethodDispatcher {
    MethodDispatcher::new(launch).with_method(GET_DEMO_MODE, |_call, launch| {
        MethodOutcome::success(launch.get_bool(DEMO_MODE_KEY, false))
    })
}
