//! Constants shared across the update workflow.
//!
//! Default layout names, probe parameters and progress cadence live here so
//! the configuration defaults and the tests agree on a single value.

use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "apup.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "APUP_CONFIG";

/// Environment variable that disables all progress indicators when set.
pub const NO_PROGRESS_ENV_VAR: &str = "APUP_NO_PROGRESS";

/// Default user-data root, relative to the working directory.
pub const DEFAULT_DATA_ROOT: &str = "dados";

/// Default staging directory for freshly fetched sources.
pub const DEFAULT_STAGING_DIR: &str = ".apup-staging";

/// Prefix of every snapshot directory name.
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "backup_";

/// Timestamp layout appended to [`DEFAULT_SNAPSHOT_PREFIX`].
///
/// Millisecond precision keeps two runs in the same second apart.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Default location of the revision record written after a completed run.
pub const DEFAULT_REVISION_RECORD: &str = ".apup/revision.json";

/// Default countdown before the first destructive step.
pub const DEFAULT_COUNTDOWN_SECS: u64 = 5;

/// Emit a copy progress event every this many entries.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// Interval between heartbeat ticks while an external operation runs.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(120);

/// Timeout applied to a single reachability probe request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of reachability probe attempts after the first one.
pub const PROBE_RETRIES: usize = 2;

/// Starting delay between probe attempts (milliseconds).
pub const PROBE_BACKOFF_MS: u64 = 250;

/// Timeout for the revision metadata request.
pub const REVISION_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// User agent sent to the revision API.
pub const USER_AGENT: &str = concat!("apup/", env!("CARGO_PKG_VERSION"));
