use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::session::Session;
use crate::types::{
    Amenity, ErrorBody, LoginRequest, LoginResponse, NewReview, Place, Places, Review, Reviews,
    User,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api/v1";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    /// The request never got an answer
    #[error("connection error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered 2xx with a body we could not read
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// The operation needs a session and none was supplied
    #[error("not logged in")]
    Unauthenticated,
}

impl ApiError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }
}

/// The HBnB REST API, as far as this client uses it
#[async_trait]
pub trait Api: Send + Sync {
    async fn list_places(&self, session: &Session) -> Result<Places, ApiError>;
    async fn get_place(&self, session: &Session, id: &str) -> Result<Place, ApiError>;
    async fn get_user(&self, session: &Session, id: &str) -> Result<User, ApiError>;
    async fn list_reviews(&self, session: &Session) -> Result<Reviews, ApiError>;
    /// `Ok` means the server accepted the review. The created record comes
    /// back only when the response body could be read as one.
    async fn create_review(
        &self,
        session: &Session,
        review: &NewReview<'_>,
    ) -> Result<Option<Review>, ApiError>;
    async fn get_amenity(&self, session: &Session, id: &str) -> Result<Amenity, ApiError>;
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;
}

/// Human readable reason for a rejected request: the JSON error payload when
/// there is one, otherwise the status text.
pub fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(body) => body
            .into_message()
            .unwrap_or_else(|| "Unknown error".to_string()),
        Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        HttpApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%method, %url, authenticated = session.is_authenticated(), "api request");
        let request = self.client.request(method, url);
        match session.bearer() {
            Some(bearer) => request.header(reqwest::header::AUTHORIZATION, bearer),
            None => request,
        }
    }

    /// Body of a 2xx response, anything else is a rejection
    async fn accepted(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "api response");
        if !status.is_success() {
            return Err(ApiError::Rejected {
                status,
                message: rejection_message(status, &body),
            });
        }
        Ok(body.to_vec())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.accepted(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn list_places(&self, session: &Session) -> Result<Places, ApiError> {
        self.send(self.request(Method::GET, "places", session)).await
    }

    async fn get_place(&self, session: &Session, id: &str) -> Result<Place, ApiError> {
        self.send(self.request(Method::GET, &format!("places/{id}"), session))
            .await
    }

    async fn get_user(&self, session: &Session, id: &str) -> Result<User, ApiError> {
        self.send(self.request(Method::GET, &format!("users/{id}"), session))
            .await
    }

    async fn list_reviews(&self, session: &Session) -> Result<Reviews, ApiError> {
        self.send(self.request(Method::GET, "reviews", session)).await
    }

    async fn create_review(
        &self,
        session: &Session,
        review: &NewReview<'_>,
    ) -> Result<Option<Review>, ApiError> {
        if !session.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }
        let body = self
            .accepted(self.request(Method::POST, "reviews", session).json(review))
            .await?;
        match serde_json::from_slice(&body) {
            Ok(created) => Ok(Some(created)),
            Err(e) => {
                warn!(error = %e, "review accepted with an unreadable body");
                Ok(None)
            }
        }
    }

    async fn get_amenity(&self, session: &Session, id: &str) -> Result<Amenity, ApiError> {
        self.send(self.request(Method::GET, &format!("amenities/{id}"), session))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest { email, password };
        self.send(
            self.request(Method::POST, "auth/login", &Session::anonymous())
                .json(&body),
        )
        .await
    }
}

/// In-process API used by the tests of every module that talks to the server
#[cfg(test)]
pub mod fake {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeApi {
        pub places: Vec<Place>,
        pub users: HashMap<String, User>,
        pub amenities: HashMap<String, Amenity>,
        pub reviews: Vec<Review>,
        /// Paths that answer with a 500
        pub failing: HashSet<String>,
        /// Paths that behave like an unreachable server
        pub unreachable: HashSet<String>,
        pub login_token: Option<String>,
        pub review_rejection: Option<(StatusCode, String)>,
        pub calls: Mutex<Vec<String>>,
        pub created: Mutex<Vec<(String, i64, String)>>,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FakeApi {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, path: String, session: &Session) -> Result<(), ApiError> {
            let tag = if session.is_authenticated() { "auth" } else { "anon" };
            self.calls.lock().unwrap().push(format!("{path} {tag}"));
            if self.unreachable.contains(&path) {
                // Any failure that is not a rejection reads as a lost connection
                return Err(ApiError::Decode(
                    serde_json::from_str::<()>("unreachable").unwrap_err(),
                ));
            }
            if self.failing.contains(&path) {
                return Err(ApiError::Rejected {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal Server Error".to_string(),
                });
            }
            Ok(())
        }

        fn not_found(what: &str) -> ApiError {
            ApiError::Rejected {
                status: StatusCode::NOT_FOUND,
                message: format!("{what} not found"),
            }
        }
    }

    #[async_trait]
    impl Api for FakeApi {
        async fn list_places(&self, session: &Session) -> Result<Places, ApiError> {
            self.record("places".to_string(), session)?;
            Ok(self.places.clone())
        }

        async fn get_place(&self, session: &Session, id: &str) -> Result<Place, ApiError> {
            self.record(format!("places/{id}"), session)?;
            self.places
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| Self::not_found("Place"))
        }

        async fn get_user(&self, session: &Session, id: &str) -> Result<User, ApiError> {
            self.record(format!("users/{id}"), session)?;
            self.users
                .get(id)
                .cloned()
                .ok_or_else(|| Self::not_found("User"))
        }

        async fn list_reviews(&self, session: &Session) -> Result<Reviews, ApiError> {
            self.record("reviews".to_string(), session)?;
            Ok(self.reviews.clone())
        }

        async fn create_review(
            &self,
            session: &Session,
            review: &NewReview<'_>,
        ) -> Result<Option<Review>, ApiError> {
            self.record("reviews POST".to_string(), session)?;
            if !session.is_authenticated() {
                return Err(ApiError::Unauthenticated);
            }
            if let Some((status, body)) = &self.review_rejection {
                return Err(ApiError::Rejected {
                    status: *status,
                    message: rejection_message(*status, body.as_bytes()),
                });
            }
            self.created.lock().unwrap().push((
                review.text.to_string(),
                review.rating,
                review.place_id.to_string(),
            ));
            Ok(Some(Review {
                id: "new".to_string(),
                text: review.text.to_string(),
                rating: review.rating,
                place_id: review.place_id.to_string(),
                user_id: "me".to_string(),
            }))
        }

        async fn get_amenity(&self, session: &Session, id: &str) -> Result<Amenity, ApiError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.record(format!("amenities/{id}"), session)?;
            self.amenities
                .get(id)
                .cloned()
                .ok_or_else(|| Self::not_found("Amenity"))
        }

        async fn login(&self, email: &str, _password: &str) -> Result<LoginResponse, ApiError> {
            self.record(format!("auth/login {email}"), &Session::anonymous())?;
            match &self.login_token {
                Some(token) => Ok(LoginResponse {
                    access_token: token.clone(),
                }),
                None => Err(ApiError::Rejected {
                    status: StatusCode::UNAUTHORIZED,
                    message: rejection_message(
                        StatusCode::UNAUTHORIZED,
                        br#"{"error": "Invalid credentials"}"#,
                    ),
                }),
            }
        }
    }
}
