/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and token refresh
/// - `users`: The authenticated user's account
/// - `books`: Address books
/// - `contacts`: Contacts and their group memberships
/// - `groups`: Groups and their members
///
/// Every success body carries `"status": "success"` and a human readable
/// `message` next to the resource fields.

pub mod auth;
pub mod books;
pub mod contacts;
pub mod groups;
pub mod health;
pub mod users;

use serde::{Deserialize, Deserializer, Serialize};

/// Success envelope
///
/// `data` is flattened into the envelope, so it must serialize as a map.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub status: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data,
        }
    }
}

/// Data-less success body
#[derive(Debug, Serialize)]
pub struct Empty {}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent gives `None`, `null` gives `Some(None)`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.phone, None);

        let cleared: Patch = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(cleared.phone, Some(None));

        let set: Patch = serde_json::from_str(r#"{"phone": "555-0100"}"#).unwrap();
        assert_eq!(set.phone, Some(Some("555-0100".to_string())));
    }

    #[test]
    fn test_success_envelope_flattens_data() {
        #[derive(Serialize)]
        struct Data {
            contact_id: u32,
        }

        let json = serde_json::to_value(Success::new("Contact created", Data { contact_id: 7 })).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Contact created");
        assert_eq!(json["contact_id"], 7);

        let json = serde_json::to_value(Success::new("Deleted", Empty {})).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
