//! Constants shared by the binary and the services.

/// Where users are pointed to when configuration is missing or invalid
pub const DOCUMENTATION_URL: &str =
	"https://github.com/chargedtoken/charged-token-indexer#configuration";

/// Default root of the persisted state, overridden by STATE_DATA_DIR
pub const DEFAULT_STATE_DATA_DIR: &str = "data";

/// Default location of the network configuration files
pub const DEFAULT_NETWORKS_DIR: &str = "config/networks";

/// Capacity of the update broadcast channel
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the block-head broadcast channel
pub const HEAD_CHANNEL_CAPACITY: usize = 256;
