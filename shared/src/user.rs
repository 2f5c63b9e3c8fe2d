use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Opaque identifier the relay hands out on connect.
pub type UserId = String;

/// State of one connected user.
///
/// `x` and `y` are normalized device coordinates in `[-1, 1]`, with `y`
/// pointing up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserState {
    pub x: f64,
    pub y: f64,
    /// Avatar reference. Travels as `false` when absent.
    #[serde(default, with = "avatar")]
    #[ts(type = "string | false")]
    pub img: Option<String>,
}

impl UserState {
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, img: None }
    }
}

mod avatar {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Reference(String),
        Flag(bool),
    }

    pub fn serialize<S: Serializer>(img: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        match img {
            Some(reference) => s.serialize_str(reference),
            None => s.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        // `true` carries no reference, so it is treated like `false`.
        Ok(match Option::<Raw>::deserialize(d)? {
            Some(Raw::Reference(reference)) => Some(reference),
            Some(Raw::Flag(_)) | None => None,
        })
    }
}
