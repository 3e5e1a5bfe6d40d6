//! Test harness utilities for the launch and poll loop suites.

mod daemonizer;
mod engines;
mod reporter;
mod world;

pub use daemonizer::{DaemonCall, RecordingDaemonizer};
pub use engines::{
    EngineEvent, EngineLog, FakeBroadcaster, FakeDiscovery, FakeEngines, FakeRelay,
};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use world::{LaunchWorld, SEED_PUBLIC_KEY};
