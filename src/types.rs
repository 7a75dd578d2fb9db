use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Places = Vec<Place>;
pub type Reviews = Vec<Review>;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A rentable listing as returned by `GET /places` and `GET /places/{id}`
pub struct Place {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub amenities: Option<AmenityIds>,
}

/// The `amenities` field of a place. The API is supposed to send a list of
/// ids but anything else is kept around so it can be reported as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmenityIds {
    List(Vec<String>),
    Malformed(Value),
}

impl Place {
    /// Amenity ids when the field is a well-formed, non-empty list
    pub fn amenity_ids(&self) -> Option<&[String]> {
        match &self.amenities {
            Some(AmenityIds::List(ids)) if !ids.is_empty() => Some(ids),
            _ => None,
        }
    }

    pub fn has_malformed_amenities(&self) -> bool {
        matches!(self.amenities, Some(AmenityIds::Malformed(ref v)) if !v.is_null())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub text: String,
    pub rating: i64,
    pub place_id: String,
    pub user_id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Body of `POST /reviews`. The author is taken from the bearer token server side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReview<'a> {
    pub text: &'a str,
    pub rating: i64,
    pub place_id: &'a str,
}

/// Error payload of a rejected request. Different endpoints use different keys.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
    pub description: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).or(self.description)
    }
}
