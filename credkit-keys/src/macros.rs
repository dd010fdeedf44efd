// Level-gated logging shims forwarding to credkit_common::logging::Logger.
// Arguments are only formatted when the level is enabled.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_with {
    ($level:ident, $method:ident, $logger:expr, $($arg:tt)*) => {{
        if ::log::log_enabled!(::log::Level::$level) {
            ($logger).$method(format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_with!(Debug, debug_args, $logger, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_with!(Info, info_args, $logger, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_with!(Warn, warn_args, $logger, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::__log_with!(Error, error_args, $logger, $($arg)*)
    };
}

// p192 only ships verification and carries no key aliases of its own.
pub(crate) mod nist_p192 {
    pub use ::p192::*;

    pub type SecretKey = ::elliptic_curve::SecretKey<NistP192>;
    pub type PublicKey = ::elliptic_curve::PublicKey<NistP192>;
}

// Binds `$c` to the curve crate matching `$curve` so one body can be written
// against `$c::SecretKey`, `$c::ecdsa::SigningKey` and friends.
macro_rules! with_curve {
    ($curve:expr, $c:ident => $body:expr) => {
        match $curve {
            $crate::types::Curve::P192 => {
                use $crate::macros::nist_p192 as $c;
                $body
            }
            $crate::types::Curve::P256 => {
                use ::p256 as $c;
                $body
            }
            $crate::types::Curve::P384 => {
                use ::p384 as $c;
                $body
            }
            $crate::types::Curve::P521 => {
                use ::p521 as $c;
                $body
            }
        }
    };
}

pub(crate) use with_curve;
