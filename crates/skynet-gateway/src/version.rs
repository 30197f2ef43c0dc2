/// Current version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit hash embedded at compile time by `build.rs`.
pub const GIT_SHA: &str = env!("SKYNET_GIT_SHA");
