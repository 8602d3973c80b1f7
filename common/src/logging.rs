/// Logs an `INFO` event on the `volley::success` target.
///
/// The terminal formatter renders these with a dedicated marker so completed
/// phases stand out from regular progress messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__private::tracing::info!(target: $crate::logging::SUCCESS_TARGET, $($arg)*)
    };
}

pub const SUCCESS_TARGET: &str = "volley::success";
