//! File Lifecycle Management
//!
//! Asset storage with TTL expiry, capacity limits and a background sweeper.

pub mod asset;
pub mod clock;
pub mod registry;
pub mod sweeper;

pub use asset::{sha256_hex, Asset, AssetId, AssetOrigin, EncodedAudio};
pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{AssetRegistry, RegistryLimits, RegistryStats};
pub use sweeper::{spawn_sweeper, SweeperHandle};
