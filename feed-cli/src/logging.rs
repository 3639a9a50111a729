use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Диагностика CLI: уровень берётся из `LOG_LEVEL`/`RUST_LOG` (см. `Settings`),
/// по умолчанию `warn`, чтобы команды печатали только свой результат.
/// Логи идут в stderr без времени: вызов живёт секунды, а stdout занят лентой.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(cli_filter(level))
        .with_target(true)
        .without_time()
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

// Опечатка в уровне не должна ронять команду.
fn cli_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn directives_are_taken_from_settings() {
        let filter = cli_filter("warn,feed_client=debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn invalid_level_falls_back_to_warn() {
        let filter = cli_filter("feed_client=loud");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
