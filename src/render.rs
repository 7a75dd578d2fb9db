use crate::lookup::{AmenityNames, Lookup};
use crate::page::Element;
use crate::types::{Place, Review};

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_USER: &str = "Unknown User";
const PLACE_IMAGE: &str = "/images/appart.jpg";
/// How many amenity names a card shows before summarising the rest
const CARD_AMENITIES: usize = 3;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// How a place's amenities read once their names are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmenitySummary {
    Names(AmenityNames),
    Malformed,
}

impl AmenitySummary {
    /// Every resolved name, or "None"
    pub fn full(&self) -> String {
        match self {
            AmenitySummary::Names(a) if !a.names.is_empty() => a.names.join(", "),
            AmenitySummary::Names(_) => "None".to_string(),
            AmenitySummary::Malformed => "Invalid amenities format".to_string(),
        }
    }

    /// The first three names, then `(+k more)`
    pub fn short(&self) -> String {
        match self {
            AmenitySummary::Names(a) if a.names.len() > CARD_AMENITIES => format!(
                "{} (+{} more)",
                a.names[..CARD_AMENITIES].join(", "),
                a.names.len() - CARD_AMENITIES
            ),
            // A malformed list never reaches a card; the list page treats it as empty
            AmenitySummary::Malformed => "None".to_string(),
            _ => self.full(),
        }
    }
}

fn text(value: &Option<String>) -> String {
    escape(value.as_deref().unwrap_or_default())
}

pub fn place_card(place: &Place, amenities: &AmenitySummary) -> Element {
    Element::new("div")
        .class("place-card")
        .attr("data-price", &place.price.to_string())
        .html(format!(
            r#"
            <img src="{PLACE_IMAGE}" alt="{title}" class="place-image">
            <h3>{title}</h3>
            <p>{description}</p>
            <p>Location: {lat}, {lon}</p>
            <p>Price: {price} €</p>
            <p>Amenities: {amenities}</p>
            <a href="place.html?id={id}" class="details-button">View Details</a>
        "#,
            title = escape(&place.title),
            description = text(&place.description),
            lat = place.latitude,
            lon = place.longitude,
            price = place.price,
            amenities = escape(&amenities.short()),
            id = escape(&place.id),
        ))
}

pub fn place_details(place: &Place, owner: &Lookup<String>, amenities: &AmenitySummary) -> String {
    format!(
        r#"
            <img src="{PLACE_IMAGE}" alt="{title}" class="place-image">
            <h2>{title}</h2>
            <div class="place-info">
                <p>Host: {owner}</p>
                <p>Price per night: {price} €</p>
                <p>Description: {description}</p>
                <p>Location: {lat}, {lon}</p>
                <p>Amenities: {amenities}</p>
            </div>
        "#,
        title = escape(&place.title),
        owner = escape(owner.or(UNKNOWN)),
        price = place.price,
        description = text(&place.description),
        lat = place.latitude,
        lon = place.longitude,
        amenities = escape(&amenities.full()),
    )
}

pub fn review_card(review: &Review, author: &Lookup<String>) -> Element {
    Element::new("div").class("review-card").html(format!(
        r#"
                    <p>{text}</p>
                    <p>User: {user}</p>
                    <p>Rating: {rating}/5</p>
                "#,
        text = escape(&review.text),
        user = escape(author.or(UNKNOWN_USER)),
        rating = review.rating,
    ))
}

pub fn login_message() -> Element {
    Element::new("div")
        .id("login-message")
        .class("add-review")
        .html(
            r#"
                    <h2>Add a Review</h2>
                    <p>You must be logged in to submit a review.</p>
                    <a href="login.html" class="details-button">Login</a>
                "#,
        )
}

pub fn message(text: &str) -> String {
    format!("<p>{}</p>", escape(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str], unresolved: usize) -> AmenitySummary {
        AmenitySummary::Names(AmenityNames {
            names: names.iter().map(|n| n.to_string()).collect(),
            unresolved,
        })
    }

    fn place() -> Place {
        Place {
            id: "p1".to_string(),
            title: "Sea <view>".to_string(),
            description: Some("Quiet".to_string()),
            price: 80.0,
            latitude: 43.5,
            longitude: 7.25,
            ..Default::default()
        }
    }

    #[test]
    fn amenity_summaries() {
        assert_eq!(names(&[], 0).short(), "None");
        assert_eq!(names(&[], 3).full(), "None");
        assert_eq!(names(&["Wifi", "Pool"], 1).short(), "Wifi, Pool");
        assert_eq!(
            names(&["Wifi", "Pool", "Gym", "Sauna", "Bar"], 0).short(),
            "Wifi, Pool, Gym (+2 more)"
        );
        assert_eq!(
            names(&["Wifi", "Pool", "Gym", "Sauna"], 0).full(),
            "Wifi, Pool, Gym, Sauna"
        );
        assert_eq!(AmenitySummary::Malformed.full(), "Invalid amenities format");
    }

    #[test]
    fn card_markup() {
        let card = place_card(&place(), &names(&["Wifi"], 0));
        assert_eq!(card.attrs["data-price"], "80");
        assert!(card.html.contains("<h3>Sea &lt;view&gt;</h3>"));
        assert!(card.html.contains("<p>Location: 43.5, 7.25</p>"));
        assert!(card.html.contains("<p>Price: 80 €</p>"));
        assert!(card.html.contains("<p>Amenities: Wifi</p>"));
        assert!(card.html.contains(r#"href="place.html?id=p1""#));
    }

    #[test]
    fn details_use_placeholders() {
        let html = place_details(&place(), &Lookup::Unresolved, &names(&[], 2));
        assert!(html.contains("<p>Host: Unknown</p>"));
        assert!(html.contains("<p>Amenities: None</p>"));

        let html = place_details(
            &place(),
            &Lookup::Resolved("Ada Lovelace".to_string()),
            &AmenitySummary::Malformed,
        );
        assert!(html.contains("<p>Host: Ada Lovelace</p>"));
        assert!(html.contains("<p>Amenities: Invalid amenities format</p>"));
    }

    #[test]
    fn review_markup() {
        let review = Review {
            text: "Lovely".to_string(),
            rating: 4,
            ..Default::default()
        };
        let card = review_card(&review, &Lookup::Unresolved);
        assert!(card.has_class("review-card"));
        assert!(card.html.contains("<p>User: Unknown User</p>"));
        assert!(card.html.contains("<p>Rating: 4/5</p>"));
    }
}
