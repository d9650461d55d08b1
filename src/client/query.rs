//! Query parameter sanitizing and serialization.

// crates.io
use url::form_urlencoded::Serializer;
// self
use crate::_prelude::*;

/// Ordered query parameters attached to a dispatch.
///
/// Top-level `null` values and absent optionals are dropped. Nested arrays and objects use
/// bracket notation (`ids[0]=1`, `filter[status]=open`), and nested `null`s serialize with an
/// empty value.
///
/// Keys and values are percent-encoded per RFC 3986: a space becomes `%20` rather than `+`,
/// `~` stays literal, and brackets are encoded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams(Vec<(String, Value)>);
impl QueryParams {
	/// Creates an empty parameter list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a parameter; [`Value::Null`] is dropped at serialization time.
	pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.0.push((key.into(), value.into()));
	}

	/// Builder-style [`QueryParams::push`].
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.push(key, value);

		self
	}

	/// Appends a parameter only when `value` is present.
	pub fn with_opt<V>(self, key: impl Into<String>, value: Option<V>) -> Self
	where
		V: Into<Value>,
	{
		match value {
			Some(value) => self.with(key, value),
			None => self,
		}
	}

	/// Returns `true` when no parameters were supplied.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Sanitized, flattened `(key, value)` pairs in insertion order.
	pub fn pairs(&self) -> Vec<(String, String)> {
		let mut pairs = Vec::with_capacity(self.0.len());

		for (key, value) in &self.0 {
			if !value.is_null() {
				flatten(key, value, &mut pairs);
			}
		}

		pairs
	}

	/// Percent-encoded query string, or `None` when nothing survives sanitizing.
	pub fn to_query_string(&self) -> Option<String> {
		let pairs = self.pairs();

		if pairs.is_empty() {
			return None;
		}

		Some(rfc3986(&Serializer::new(String::new()).extend_pairs(pairs).finish()))
	}

	pub(crate) fn append_to(&self, url: &mut Url) {
		let Some(encoded) = self.to_query_string() else {
			return;
		};
		let query = match url.query() {
			Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
			_ => encoded,
		};

		url.set_query(Some(&query));
	}
}
impl<K, V> FromIterator<(K, V)> for QueryParams
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		Self(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
	}
}

/// Rewrites form encoding into RFC 3986 component encoding.
///
/// The form serializer already escapes literal `+` and `~` (as `%2B` and `%7E`), so every
/// remaining `+` stands for a space. `*` is the one character it leaves raw that RFC 3986
/// components escape.
fn rfc3986(form: &str) -> String {
	form.replace('+', "%20").replace('*', "%2A").replace("%7E", "~")
}

fn flatten(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
	match value {
		Value::Null => out.push((key.to_owned(), String::new())),
		Value::Bool(flag) => out.push((key.to_owned(), flag.to_string())),
		Value::Number(number) => out.push((key.to_owned(), number.to_string())),
		Value::String(text) => out.push((key.to_owned(), text.clone())),
		Value::Array(items) =>
			for (idx, item) in items.iter().enumerate() {
				flatten(&format!("{key}[{idx}]"), item, out);
			},
		Value::Object(map) =>
			for (field, item) in map {
				flatten(&format!("{key}[{field}]"), item, out);
			},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn nulls_and_absent_values_are_dropped_in_order() {
		let query = QueryParams::new()
			.with("a", 1)
			.with("b", Value::Null)
			.with_opt("c", None::<&str>)
			.with("d", "x");

		assert_eq!(query.to_query_string().as_deref(), Some("a=1&d=x"));
	}

	#[test]
	fn all_null_query_serializes_to_nothing() {
		let query: QueryParams = [("a", Value::Null), ("b", Value::Null)].into_iter().collect();

		assert!(!query.is_empty());
		assert_eq!(query.to_query_string(), None);

		let mut url = Url::parse("https://mp.example.com/products")
			.expect("Fixture URL should parse.");

		query.append_to(&mut url);

		assert_eq!(url.as_str(), "https://mp.example.com/products");
	}

	#[test]
	fn nested_values_use_bracket_notation() {
		let query = QueryParams::new()
			.with("ids", serde_json::json!([1, 2]))
			.with("filter", serde_json::json!({ "status": "open", "tag": null }))
			.with("active", true);

		assert_eq!(
			query.pairs(),
			vec![
				("ids[0]".to_owned(), "1".to_owned()),
				("ids[1]".to_owned(), "2".to_owned()),
				("filter[status]".to_owned(), "open".to_owned()),
				("filter[tag]".to_owned(), String::new()),
				("active".to_owned(), "true".to_owned()),
			]
		);
		assert_eq!(
			query.to_query_string().as_deref(),
			Some("ids%5B0%5D=1&ids%5B1%5D=2&filter%5Bstatus%5D=open&filter%5Btag%5D=&active=true")
		);
	}

	#[test]
	fn append_extends_existing_query() {
		let mut url =
			Url::parse("https://mp.example.com/orders?page=2").expect("Fixture URL should parse.");

		QueryParams::new().with("q", "red shoes").append_to(&mut url);

		assert_eq!(url.as_str(), "https://mp.example.com/orders?page=2&q=red%20shoes");
	}

	#[test]
	fn encoding_follows_rfc3986() {
		let query = QueryParams::new().with("q", "a b+c").with("sort", "~name*");

		assert_eq!(query.to_query_string().as_deref(), Some("q=a%20b%2Bc&sort=~name%2A"));
	}
}
