//! Macro for implementing name conversions on configuration enums
//!
//! Strategies, presets and backoff kinds are all addressed by name in
//! configuration payloads, legacy keys and CLI arguments. This macro
//! generates the conversions once so every enum parses the same way.
//!
//! # Example
//!
//! ```rust
//! use bulwark_domain::impl_named_enum;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Tier {
//!     Free,
//!     Paid,
//! }
//!
//! impl_named_enum!(Tier {
//!     Free => "free",
//!     Paid => "paid",
//! });
//!
//! assert_eq!(Tier::Paid.as_str(), "paid");
//! assert_eq!(" FREE ".parse::<Tier>(), Ok(Tier::Free));
//! assert_eq!(Tier::names(), &["free", "paid"]);
//! ```

/// Implements `as_str`, `names`, `Display` and `FromStr` for a fieldless enum
///
/// # Features
///
/// - Case-insensitive parsing with surrounding whitespace ignored
/// - `-` accepted in place of `_` (`half-open` parses as `half_open`)
/// - Consistent lowercase string output
/// - Error message names the enum and lists valid values
#[macro_export]
macro_rules! impl_named_enum {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase name
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }

            /// All canonical names, in declaration order
            pub const fn names() -> &'static [&'static str] {
                &[$($str,)+]
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().replace('-', "_").as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!(
                        "Invalid {}: '{}' (expected one of: {})",
                        stringify!($enum_name),
                        s,
                        Self::names().join(", ")
                    )),
                }
            }
        }
    };
}
