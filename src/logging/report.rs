use scopebus_error::{ErrorExt, LogLevel};
use tracing::{debug, error, info, trace, warn};

/// Пишет ошибку в лог на уровне, который задаёт её статус-код.
///
/// Детали (`log_message`) попадают только в лог; вызывающей стороне
/// предназначен `client_message`.
pub fn log_error<E: ErrorExt>(err: &E) {
    let status = err.status_code();
    let detail = err.log_message();
    let error_type = err.type_name();
    let tags = err.metrics_tags();

    macro_rules! emit {
        ($level:ident) => {
            $level!(
                status = %status,
                %error_type,
                client_error = status.is_client_error(),
                handler_error = status.is_handler_error(),
                ?tags,
                %detail,
                "{}",
                err.client_message()
            )
        };
    }

    match status.log_level() {
        LogLevel::Trace => emit!(trace),
        LogLevel::Debug => emit!(debug),
        LogLevel::Info => emit!(info),
        LogLevel::Warn => emit!(warn),
        LogLevel::Error => emit!(error),
    }
}
