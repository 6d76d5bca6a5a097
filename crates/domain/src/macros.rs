//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Job statuses, badge hints and RPC action names all travel as plain
//! strings. This macro generates the `as_str`, `Display` and `FromStr`
//! implementations from a single variant-to-string table so the mapping
//! cannot drift between directions.
//!
//! # Example
//!
//! ```rust
//! use vidsum_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Download,
//!     Transcribe,
//! }
//!
//! impl_wire_name_conversions!(Phase {
//!     Download => "download",
//!     Transcribe => "transcribe",
//! });
//!
//! assert_eq!(Phase::Download.as_str(), "download");
//! assert_eq!("transcribe".parse::<Phase>().unwrap(), Phase::Transcribe);
//! ```

/// Implements `as_str`, Display and FromStr for wire-named enums
///
/// Parsing is exact (case-sensitive): wire names such as `getTaskStatus`
/// are identifiers, not prose.
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire name of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        ::std::stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
