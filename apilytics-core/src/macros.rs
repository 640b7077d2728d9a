// Exported for use in the transports of the `apilytics` crate.
/// Emits a diagnostic message when diagnostics are enabled.
///
/// The first argument is anything that evaluates to a `bool`, usually
/// `options.debug`.  With the `debug-logs` feature the message goes to the
/// `apilytics` target of the `log` crate, otherwise it is printed to stderr.
#[macro_export]
#[doc(hidden)]
macro_rules! apilytics_debug {
    ($enabled:expr, $($arg:tt)*) => {
        if $enabled {
            #[cfg(feature = "debug-logs")]
            {
                ::log::debug!(target: "apilytics", $($arg)*);
            }
            #[cfg(not(feature = "debug-logs"))]
            {
                eprint!("[apilytics] ");
                eprintln!($($arg)*);
            }
        }
    };
}
