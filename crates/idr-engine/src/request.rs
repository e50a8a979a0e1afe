use serde::{Deserialize, Deserializer, Serialize};

/// Identifiers submitted for one reconciliation.
///
/// Either field may be absent. Phone numbers are accepted as JSON strings
/// or numbers and always handled as strings afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone_number: Option<String>,
}

impl IdentifyRequest {
    pub fn new(email: Option<&str>, phone_number: Option<&str>) -> Self {
        Self {
            email: email.map(str::to_owned),
            phone_number: phone_number.map(str::to_owned),
        }
    }

    /// Trim both fields; a blank value counts as absent.
    pub fn normalized(&self) -> Self {
        Self {
            email: normalize(self.email.as_deref()),
            phone_number: normalize(self.phone_number.as_deref()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone_number.is_none()
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneField {
    Text(String),
    Number(u64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PhoneField>::deserialize(deserializer)?.map(|field| match field {
        PhoneField::Text(text) => text,
        PhoneField::Number(number) => number.to_string(),
    }))
}
