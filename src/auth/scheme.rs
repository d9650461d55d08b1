//! Authentication scheme labels and the token kinds bearer schemes exchange for.

// self
use crate::{_prelude::*, error::ValidationError};

/// Authentication scheme applied to outbound requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthScheme {
	/// No `Authorization` header.
	#[default]
	#[serde(rename = "none")]
	None,
	/// `Authorization: Basic base64(user:pass)`.
	Basic,
	/// Supplier bearer token minted by `/token`.
	Bearer,
	/// Fulfillment bearer token minted by `/fulfillment/token`.
	BearerFulfillment,
}
impl AuthScheme {
	/// Returns the wire label used in credentials and configuration.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Basic => "Basic",
			Self::Bearer => "Bearer",
			Self::BearerFulfillment => "BearerFulfillment",
		}
	}

	/// Token kind exchanged for this scheme, if the scheme is bearer-derived.
	pub const fn token_kind(self) -> Option<TokenKind> {
		match self {
			Self::Bearer => Some(TokenKind::Supplier),
			Self::BearerFulfillment => Some(TokenKind::Fulfillment),
			Self::None | Self::Basic => None,
		}
	}

	/// Returns `true` for [`AuthScheme::Bearer`] and [`AuthScheme::BearerFulfillment`].
	pub const fn is_bearer(self) -> bool {
		self.token_kind().is_some()
	}
}
impl Display for AuthScheme {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for AuthScheme {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"" | "none" => Ok(Self::None),
			"Basic" => Ok(Self::Basic),
			"Bearer" => Ok(Self::Bearer),
			"BearerFulfillment" => Ok(Self::BearerFulfillment),
			other => Err(ValidationError::UnknownScheme { label: other.to_owned() }),
		}
	}
}

/// Bearer token flavors, each minted by its own exchange endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
	/// Supplier API token.
	#[default]
	Supplier,
	/// Fulfillment API token.
	Fulfillment,
}
impl TokenKind {
	/// Path of the exchange endpoint, relative to the base URL.
	pub const fn endpoint(self) -> &'static str {
		match self {
			Self::Supplier => "/token",
			Self::Fulfillment => "/fulfillment/token",
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Supplier => "supplier",
			Self::Fulfillment => "fulfillment",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn schemes_parse_from_wire_labels() {
		assert_eq!("Bearer".parse::<AuthScheme>(), Ok(AuthScheme::Bearer));
		assert_eq!("BearerFulfillment".parse::<AuthScheme>(), Ok(AuthScheme::BearerFulfillment));
		assert_eq!("none".parse::<AuthScheme>(), Ok(AuthScheme::None));
		assert!(matches!(
			"OAuth".parse::<AuthScheme>(),
			Err(ValidationError::UnknownScheme { label }) if label == "OAuth"
		));
	}

	#[test]
	fn scheme_serde_uses_wire_labels() {
		let none: AuthScheme =
			serde_json::from_str("\"none\"").expect("`none` should deserialize.");

		assert_eq!(none, AuthScheme::None);
		assert_eq!(
			serde_json::to_string(&AuthScheme::BearerFulfillment)
				.expect("Scheme should serialize."),
			"\"BearerFulfillment\""
		);
	}

	#[test]
	fn token_kinds_select_endpoints() {
		assert_eq!(AuthScheme::Bearer.token_kind(), Some(TokenKind::Supplier));
		assert_eq!(AuthScheme::Basic.token_kind(), None);
		assert_eq!(TokenKind::Supplier.endpoint(), "/token");
		assert_eq!(TokenKind::Fulfillment.endpoint(), "/fulfillment/token");
	}
}
