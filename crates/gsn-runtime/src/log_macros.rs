//! Logging macros that stamp every runtime event with a `domain` field.
//!
//! Domains: `sys` (lifecycle), `pipe` (producers and window forwarding),
//! `res` (retention sweeps), `conf` (configuration and source validation).
//!
//! ```ignore
//! gsn_info!(sys, wrappers = 2, sources = 5, "runtime started");
//! gsn_warn!(pipe, wrapper = name, error = %e, "element insert failed");
//! ```
//!
//! The domain is a bare identifier, turned into a string by the macro.

#[doc(hidden)]
macro_rules! gsn_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

macro_rules! gsn_error {
    ($domain:ident, $($rest:tt)*) => {
        gsn_log!(error, $domain, $($rest)*)
    };
}

macro_rules! gsn_warn {
    ($domain:ident, $($rest:tt)*) => {
        gsn_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! gsn_info {
    ($domain:ident, $($rest:tt)*) => {
        gsn_log!(info, $domain, $($rest)*)
    };
}

macro_rules! gsn_debug {
    ($domain:ident, $($rest:tt)*) => {
        gsn_log!(debug, $domain, $($rest)*)
    };
}

macro_rules! gsn_trace {
    ($domain:ident, $($rest:tt)*) => {
        gsn_log!(trace, $domain, $($rest)*)
    };
}
