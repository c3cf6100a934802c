use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Denormalized copy of the authenticated user's profile.
/// Opaque apart from the identity fields; may lag behind the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionUser(pub Map<String, Value>);

impl SessionUser {
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|fields| Self(fields.clone()))
    }

    /// Account identifier used to scope cache keys. Numeric ids are stringified.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.to_owned()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.0.get("username").and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn has_identity(fields: &Map<String, Value>) -> bool {
        ["id", "username", "email"]
            .iter()
            .any(|key| fields.get(*key).is_some_and(|v| !v.is_null()))
    }

    /// Extract the user from the `data` of a profile response.
    ///
    /// Accepts `{ user: {...} }` and a bare user object carrying at least one
    /// of `id`, `username`, `email`.
    pub fn from_profile_data(data: &Value) -> Option<Self> {
        if let Some(user) = data.get("user").and_then(Value::as_object) {
            return Some(Self(user.clone()));
        }
        data.as_object()
            .filter(|fields| Self::has_identity(fields))
            .map(|fields| Self(fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_accepts_numbers_and_strings() {
        let user = SessionUser::from_value(&json!({"id": 7, "username": "asha"})).unwrap();
        assert_eq!(user.id().as_deref(), Some("7"));
        assert_eq!(user.username(), Some("asha"));

        let user = SessionUser::from_value(&json!({"id": "u-7"})).unwrap();
        assert_eq!(user.id().as_deref(), Some("u-7"));

        let user = SessionUser::from_value(&json!({"username": "asha"})).unwrap();
        assert_eq!(user.id(), None);
    }

    #[test]
    fn profile_shapes() {
        let wrapped = SessionUser::from_profile_data(&json!({"user": {"id": 1, "email": "a@x.com"}})).unwrap();
        assert_eq!(wrapped.email(), Some("a@x.com"));

        let direct = SessionUser::from_profile_data(&json!({"id": 2, "username": "b"})).unwrap();
        assert_eq!(direct.id().as_deref(), Some("2"));

        assert!(SessionUser::from_profile_data(&json!({"theme": "dark"})).is_none());
        assert!(SessionUser::from_profile_data(&json!([1, 2])).is_none());
    }
}
