//! Used when the `logging` feature is off: nothing is printed, but the level filters still gate
//! the `log` macros.

use crate::error::EpiError;
use crate::log::LogConfiguration;

impl LogConfiguration {
    pub(in crate::log) fn set_config(&mut self) -> Result<(), EpiError> {
        log::set_max_level(self.global_log_level);
        Ok(())
    }
}
