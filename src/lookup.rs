//! Resolution of the foreign keys a place carries (owner, amenities, review
//! authors). A failed lookup never fails the page: it comes back as
//! [`Lookup::Unresolved`] and the renderer decides what to show for it.

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::api::Api;
use crate::session::Session;
use crate::types::{Place, Review};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Resolved(T),
    Unresolved,
}

impl Lookup<String> {
    pub fn or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        match self {
            Lookup::Resolved(value) => value.as_str(),
            Lookup::Unresolved => placeholder,
        }
    }
}

/// Names of a place's amenities, in the order the place lists them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmenityNames {
    pub names: Vec<String>,
    /// Ids whose lookup failed. Kept apart so "no amenities" and "amenities
    /// that could not be fetched" stay distinguishable.
    pub unresolved: usize,
}

pub async fn user_name<A: Api + ?Sized>(api: &A, session: &Session, id: &str) -> Lookup<String> {
    match api.get_user(session, id).await {
        Ok(user) => Lookup::Resolved(user.full_name()),
        Err(e) => {
            warn!(user_id = id, error = %e, "could not fetch user");
            Lookup::Unresolved
        }
    }
}

pub async fn owner_name<A: Api + ?Sized>(
    api: &A,
    session: &Session,
    place: &Place,
) -> Lookup<String> {
    match place.owner_id.as_deref().filter(|id| !id.is_empty()) {
        Some(owner_id) => user_name(api, session, owner_id).await,
        None => Lookup::Unresolved,
    }
}

pub async fn amenity_name<A: Api + ?Sized>(
    api: &A,
    session: &Session,
    id: &str,
) -> Lookup<String> {
    match api.get_amenity(session, id).await {
        Ok(amenity) => match amenity.name.filter(|n| !n.is_empty()) {
            Some(name) => Lookup::Resolved(name),
            None => Lookup::Unresolved,
        },
        Err(e) => {
            warn!(amenity_id = id, error = %e, "could not fetch amenity");
            Lookup::Unresolved
        }
    }
}

/// Resolve amenity ids with at most `limit` requests in flight
pub async fn amenity_names<A: Api + ?Sized>(
    api: &A,
    session: &Session,
    ids: &[String],
    limit: usize,
) -> AmenityNames {
    let lookups: Vec<Lookup<String>> = stream::iter(ids)
        .map(|id| amenity_name(api, session, id))
        .buffered(limit.max(1))
        .collect()
        .await;

    let mut resolved = AmenityNames::default();
    for lookup in lookups {
        match lookup {
            Lookup::Resolved(name) => resolved.names.push(name),
            Lookup::Unresolved => resolved.unresolved += 1,
        }
    }
    resolved
}

/// Reviews belonging to one place. The API only lists every review, so the
/// filtering happens here. A failed listing reads as "no reviews".
pub async fn place_reviews<A: Api + ?Sized>(
    api: &A,
    session: &Session,
    place_id: &str,
) -> Vec<Review> {
    match api.list_reviews(session).await {
        Ok(reviews) => reviews
            .into_iter()
            .filter(|review| review.place_id == place_id)
            .collect(),
        Err(e) => {
            warn!(place_id, error = %e, "could not fetch reviews");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::api::fake::FakeApi;
    use crate::types::{Amenity, User};

    fn amenity(id: &str, name: &str) -> (String, Amenity) {
        (
            id.to_string(),
            Amenity {
                id: id.to_string(),
                name: Some(name.to_string()),
            },
        )
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn amenity_names_keep_order_and_count_failures() {
        let api = FakeApi {
            amenities: [amenity("a1", "Wifi"), amenity("a3", "Pool"), amenity("a4", "")]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let session = Session::with_token("t");
        let names = amenity_names(&api, &session, &ids(&["a1", "a2", "a3", "a4"]), 4).await;
        assert_eq!(names.names, ["Wifi", "Pool"]);
        assert_eq!(names.unresolved, 2);

        let none = amenity_names(&api, &session, &[], 4).await;
        assert_eq!(none, AmenityNames::default());
    }

    #[tokio::test]
    async fn amenity_requests_are_bounded() {
        let api = FakeApi {
            amenities: (0..6).map(|i| amenity(&format!("a{i}"), "x")).collect(),
            ..Default::default()
        };
        let ids: Vec<String> = (0..6).map(|i| format!("a{i}")).collect();
        let names = amenity_names(&api, &Session::anonymous(), &ids, 2).await;
        assert_eq!(names.names.len(), 6);
        assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn owner_and_user_names() {
        let api = FakeApi {
            users: [(
                "u1".to_string(),
                User {
                    id: "u1".to_string(),
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let session = Session::anonymous();
        let mut place = Place {
            owner_id: Some("u1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            owner_name(&api, &session, &place).await,
            Lookup::Resolved("Ada Lovelace".to_string())
        );

        place.owner_id = None;
        assert_eq!(owner_name(&api, &session, &place).await, Lookup::Unresolved);
        assert_eq!(api.calls(), ["users/u1 anon"]);

        let missing = user_name(&api, &session, "ghost").await;
        assert_eq!(missing.or("Unknown User"), "Unknown User");
    }

    #[tokio::test]
    async fn reviews_are_filtered_by_place() {
        let review = |id: &str, place: &str| Review {
            id: id.to_string(),
            place_id: place.to_string(),
            ..Default::default()
        };
        let mut api = FakeApi {
            reviews: vec![review("r1", "p1"), review("r2", "p2"), review("r3", "p1")],
            ..Default::default()
        };
        let session = Session::anonymous();
        let found: Vec<String> = place_reviews(&api, &session, "p1")
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(found, ["r1", "r3"]);

        api.failing.insert("reviews".to_string());
        assert!(place_reviews(&api, &session, "p1").await.is_empty());
    }
}
