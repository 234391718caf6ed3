use tracing_subscriber::{filter::ParseError, EnvFilter};

use super::config::LoggingConfig;

/// Фильтр по конфигурации. Заданная `RUST_LOG` имеет приоритет.
pub fn build_filter_from_config(config: &LoggingConfig) -> Result<EnvFilter, ParseError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(config.build_filter_directive()),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        io::{self, Write},
        sync::{Arc, Mutex},
    };

    use serial_test::serial;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;

    // Мини-буферный writer для тестов
    #[derive(Clone)]
    struct BufferWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> fmt::MakeWriter<'a> for BufferWriter {
        type Writer = BufferWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Write for BufferWriter {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Тест проверяет, что без RUST_LOG используется директива конфигурации.
    #[test]
    #[serial]
    fn test_filter_from_config() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "warn".into(),
            ..LoggingConfig::default()
        };
        let filter = build_filter_from_config(&config).unwrap();
        assert!(filter.to_string().contains("scopebus=warn"));
    }

    /// Тест проверяет приоритет RUST_LOG над конфигурацией.
    #[test]
    #[serial]
    fn test_rust_log_wins() {
        env::set_var("RUST_LOG", "trace");
        let filter = build_filter_from_config(&LoggingConfig::default()).unwrap();
        env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    #[serial]
    fn test_invalid_directive_is_error() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "scopebus=loudest".into(),
            ..LoggingConfig::default()
        };
        assert!(build_filter_from_config(&config).is_err());
    }

    /// Тест проверяет фильтрацию уровней в runtime: при `warn` сообщения
    /// info отбрасываются.
    #[test]
    #[serial]
    fn test_filter_drops_lower_levels() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "warn".into(),
            ..LoggingConfig::default()
        };
        let filter = build_filter_from_config(&config).unwrap();

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = fmt::layer()
            .with_writer(BufferWriter(Arc::clone(&buffer)))
            .with_ansi(false)
            .with_filter(filter);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("filtered out");
            tracing::warn!("passes through");
        });

        let out = String::from_utf8_lossy(&buffer.lock().unwrap()).to_string();
        assert!(out.contains("passes through"));
        assert!(!out.contains("filtered out"));
    }
}
