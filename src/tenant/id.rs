//! Installation and add-on keys.
//!
//! Client keys are opaque platform values, so they only need to be printable. App keys follow the
//! descriptor rules: ASCII letters, digits, `.`, `-` and `_`, at most 64 characters.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Longest client key accepted from an install payload.
pub const CLIENT_KEY_MAX_LEN: usize = 255;
/// Longest app key a descriptor may declare.
pub const APP_KEY_MAX_LEN: usize = 64;

macro_rules! key_type {
	($name:ident, $label:literal, $max:expr, $allowed:expr, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				Self::try_from(value.into())
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				check_key($label, &value, $max, $allowed)?;

				Ok(Self(value))
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Rejected client or app key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// No characters at all.
	#[error("The {key} is empty.")]
	Empty {
		/// `client key` or `app key`.
		key: &'static str,
	},
	/// A character outside the key's alphabet.
	#[error("The {key} contains the disallowed character {found:?}.")]
	DisallowedCharacter {
		/// `client key` or `app key`.
		key: &'static str,
		/// First offending character.
		found: char,
	},
	/// Longer than the key allows.
	#[error("The {key} is longer than {max} characters.")]
	TooLong {
		/// `client key` or `app key`.
		key: &'static str,
		/// Limit for this key.
		max: usize,
	},
}

key_type! {
	ClientKey,
	"client key",
	CLIENT_KEY_MAX_LEN,
	|c: char| !c.is_whitespace() && !c.is_control(),
	"Platform-assigned key of one installation; the issuer of inbound tokens."
}
key_type! {
	AppKey,
	"app key",
	APP_KEY_MAX_LEN,
	|c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'),
	"Key of the add-on itself; the issuer of outbound tokens."
}

fn check_key(
	key: &'static str,
	value: &str,
	max: usize,
	allowed: fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { key });
	}
	if let Some(found) = value.chars().find(|c| !allowed(*c)) {
		return Err(IdentifierError::DisallowedCharacter { key, found });
	}
	if value.chars().count() > max {
		return Err(IdentifierError::TooLong { key, max });
	}

	Ok(())
}
