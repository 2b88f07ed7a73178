use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_FILTER: &str = "warn";

pub struct LogConfig {
    pub filter: String,
}

impl LogConfig {
    /// `-v` flags win over the configured filter.
    pub fn with_verbosity(filter: &str, verbose: u8) -> Self {
        let filter = match verbose {
            0 => filter.to_owned(),
            1 => "keyrelay=debug,info".to_owned(),
            _ => "trace".to_owned(),
        };
        Self { filter }
    }
}

pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Installs the global subscriber. Output goes to stderr; stdout is
    /// reserved for command output.
    pub fn new_bootstrap() -> Self {
        let filter = EnvFilter::new(BOOTSTRAP_FILTER);
        let (filter, reload_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();

        Self { reload_handle }
    }

    pub fn reload_from_config(&self, config: &LogConfig) -> Result<()> {
        let filter = EnvFilter::try_new(&config.filter).map_err(|e| anyhow!(e))?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
