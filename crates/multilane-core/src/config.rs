//! Manager sizing configuration.

use thiserror::Error;

/// Sizing for a [`crate::JobManager`].
///
/// Lane counts follow the vectorization tiers multi-buffer engines are
/// built for: 4 lanes on the narrow tiers, 8 on the wide ones. The packed
/// lane stack reserves the 0xF nibble as its empty sentinel, so counts
/// above 8 are rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MgrConfig {
    /// Ring capacity in job slots. Must be a power of two.
    pub max_jobs: usize,
    /// Lanes per AES-CBC encryption engine.
    pub cbc_lanes: usize,
    /// Lanes per MAC engine.
    pub mac_lanes: usize,
    /// Lanes in the CCM CBC-MAC engine.
    pub ccm_lanes: usize,
}

impl Default for MgrConfig {
    fn default() -> Self {
        Self {
            max_jobs: 32,
            cbc_lanes: 4,
            mac_lanes: 4,
            ccm_lanes: 4,
        }
    }
}

/// Rejected [`MgrConfig`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("ring capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),
    #[error("lane count {0} outside 1..=8")]
    LaneCount(usize),
}

impl MgrConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_jobs < 2 || !self.max_jobs.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(self.max_jobs));
        }
        for lanes in [self.cbc_lanes, self.mac_lanes, self.ccm_lanes] {
            if !(1..=8).contains(&lanes) {
                return Err(ConfigError::LaneCount(lanes));
            }
        }
        Ok(())
    }
}
