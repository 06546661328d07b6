use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::runtime::ConfigBuilder;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::error::EpiError;
use crate::log::{LogConfiguration, ModuleLogConfiguration};

// ISO 8601 timestamp, colored level, module path
const DEFAULT_LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

impl From<&ModuleLogConfiguration> for Logger {
    fn from(module_config: &ModuleLogConfiguration) -> Self {
        Logger::builder().build(module_config.module.clone(), module_config.level)
    }
}

impl LogConfiguration {
    /// Installs a console logger with this configuration's filters, or reconfigures the one
    /// already installed.
    ///
    /// # Errors
    /// Returns `EpiError::ConfigError` if log4rs rejects the configuration or another logger is
    /// already installed for the process.
    pub(in crate::log) fn set_config(&mut self) -> Result<(), EpiError> {
        let encoder = Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN));
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(encoder)
            .build();
        let mut config: ConfigBuilder =
            Config::builder().appender(Appender::builder().build("console", Box::new(stderr)));
        for module_config in self.module_configurations.values() {
            config = config.logger(module_config.into());
        }

        let root = Root::builder()
            .appender("console")
            .build(self.global_log_level);
        let new_config = config
            .build(root)
            .map_err(|e| EpiError::ConfigError(format!("invalid log configuration: {e}")))?;

        match self.root_handle {
            Some(ref mut handle) => handle.set_config(new_config),
            None => {
                let handle = log4rs::init_config(new_config)
                    .map_err(|e| EpiError::ConfigError(format!("cannot install logger: {e}")))?;
                self.root_handle = Some(handle);
            }
        }
        Ok(())
    }
}
