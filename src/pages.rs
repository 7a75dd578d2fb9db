//! One entry point per page. The router in `main` picks the page, each page
//! renders into its own layout and reports where the user should go next.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{Api, ApiError};
use crate::filter::{self, PriceFilter};
use crate::lookup::{self, AmenityNames, Lookup};
use crate::page::{Display, Document, Element};
use crate::render::{self, AmenitySummary};
use crate::session::{self, Session};
use crate::store::{Store, StoreError};
use crate::types::{NewReview, Place};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Place { id: Option<String> },
    AddReview { id: Option<String> },
    Login,
}

impl Route {
    /// Resolve a relative location such as `place.html?id=7`
    pub fn from_location(location: &str) -> Option<Route> {
        let base = Url::parse("http://hbnb.local/").ok()?;
        let url = base.join(location).ok()?;
        let id = url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());
        let page = url
            .path_segments()
            .and_then(|segments| segments.last())
            .unwrap_or_default();
        match page {
            "" | "index.html" => Some(Route::Index),
            "place.html" => Some(Route::Place { id }),
            "add_review.html" => Some(Route::AddReview { id }),
            "login.html" => Some(Route::Login),
            _ => None,
        }
    }

    pub fn location(&self) -> String {
        let with_id = |page: &str, id: &Option<String>| match id {
            Some(id) => {
                let id: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
                format!("{page}?id={id}")
            }
            None => page.to_string(),
        };
        match self {
            Route::Index => "index.html".to_string(),
            Route::Place { id } => with_id("place.html", id),
            Route::AddReview { id } => with_id("add_review.html", id),
            Route::Login => "login.html".to_string(),
        }
    }

    fn layout(&self) -> Document {
        match self {
            Route::Index => Document::index(),
            Route::Place { .. } => Document::place(),
            Route::AddReview { .. } => Document::add_review(),
            Route::Login => Document::login(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Redirect(String),
    Reload,
}

/// What a page asks of the user agent once it is done: messages to show
/// and possibly somewhere else to go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub alerts: Vec<String>,
    pub navigation: Option<Navigation>,
}

impl Outcome {
    fn redirect(location: impl Into<String>) -> Self {
        Outcome {
            alerts: Vec::new(),
            navigation: Some(Navigation::Redirect(location.into())),
        }
    }

    fn alert(message: impl Into<String>) -> Self {
        Outcome {
            alerts: vec![message.into()],
            navigation: None,
        }
    }

    fn and_redirect(mut self, location: impl Into<String>) -> Self {
        self.navigation = Some(Navigation::Redirect(location.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub document: Document,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewForm {
    pub text: String,
    pub rating: String,
}

impl ReviewForm {
    pub fn reset(&mut self) {
        self.text.clear();
        self.rating.clear();
    }

    fn rating(&self) -> Option<i64> {
        self.rating.trim().parse().ok()
    }

    /// Reflect the form contents in the page's form controls
    pub fn fill(&self, doc: &mut Document) {
        if let Some(text) = doc.by_id_mut("review-text") {
            text.set_inner_html(render::escape(&self.text));
        }
        if let Some(rating) = doc.by_id_mut("rating") {
            for option in &mut rating.children {
                if option.attrs.get("value") == Some(&self.rating) {
                    option.attrs.insert("selected".to_string(), "selected".to_string());
                } else {
                    option.attrs.remove("selected");
                }
            }
        }
    }
}

/// A user interaction to replay once the page has loaded
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login { email: String, password: String },
    Review(ReviewForm),
    Filter(PriceFilter),
    Logout,
}

/// Everything a page needs, built once per page load
pub struct Context<'a, A: Api + ?Sized> {
    pub api: &'a A,
    pub store: &'a Store,
    pub session: Session,
    /// Upper bound on requests in flight for one batch of lookups
    pub concurrency: usize,
}

/// Load `route`, then replay `action` on it
pub async fn run<A: Api + ?Sized>(
    ctx: &Context<'_, A>,
    route: &Route,
    action: Option<Action>,
) -> Result<Page, StoreError> {
    let mut document = route.layout();
    apply_nav_gate(&mut document, &ctx.session);

    if let Some(Action::Logout) = action {
        return Ok(Page {
            document,
            outcome: logout(ctx.store)?,
        });
    }

    let outcome = match route {
        Route::Index => {
            init_index(ctx, &mut document).await;
            match action {
                Some(Action::Filter(price)) => filter::apply(&mut document, price),
                other => ignore(route, other),
            }
            Outcome::default()
        }
        Route::Place { id } => {
            init_place(ctx, &mut document, id.as_deref()).await;
            submit_if_review(ctx, &mut document, id.as_deref(), action).await
        }
        Route::AddReview { id } => {
            let outcome = init_add_review(ctx, &mut document, id.as_deref()).await;
            if outcome.navigation.is_some() {
                outcome
            } else {
                submit_if_review(ctx, &mut document, id.as_deref(), action).await
            }
        }
        Route::Login => match action {
            Some(Action::Login { email, password }) => {
                login_user(ctx.api, ctx.store, &email, &password).await?
            }
            other => {
                ignore(route, other);
                Outcome::default()
            }
        },
    };
    Ok(Page { document, outcome })
}

fn ignore(route: &Route, action: Option<Action>) {
    if action.is_some() {
        debug!(?route, "action does not apply to this page");
    }
}

async fn submit_if_review<A: Api + ?Sized>(
    ctx: &Context<'_, A>,
    document: &mut Document,
    place_id: Option<&str>,
    action: Option<Action>,
) -> Outcome {
    let Some(Action::Review(mut form)) = action else {
        return Outcome::default();
    };
    let outcome = submit_review(ctx, place_id, &mut form).await;
    form.fill(document);
    outcome
}

/// Login link for visitors, logout button for logged in users
pub fn apply_nav_gate(doc: &mut Document, session: &Session) {
    if doc.by_id("login-link").is_none() || doc.by_id("logout-button").is_none() {
        return;
    }
    let (link_display, button_display) = if session.is_authenticated() {
        (Display::None, Display::Block)
    } else {
        (Display::Block, Display::None)
    };
    if let Some(link) = doc.by_id_mut("login-link") {
        link.display = link_display;
    }
    if let Some(button) = doc.by_id_mut("logout-button") {
        button.display = button_display;
    }
}

/// Pages that need a session send visitors home before rendering anything
pub fn require_session(session: &Session) -> Option<Navigation> {
    if session.is_authenticated() {
        None
    } else {
        Some(Navigation::Redirect(Route::Index.location()))
    }
}

/// Show the review form to logged in users, a login prompt to everyone else
pub fn apply_review_form_gate(doc: &mut Document, session: &Session) {
    let Some(section) = doc.by_class_mut("add-review") else {
        return;
    };
    if session.is_authenticated() {
        section.display = Display::Block;
        if let Some(message) = doc.by_id_mut("login-message") {
            message.display = Display::None;
        }
        return;
    }
    section.display = Display::None;
    match doc.by_id_mut("login-message") {
        Some(message) => message.display = Display::Block,
        None => {
            doc.insert_after_class("add-review", render::login_message());
        }
    }
}

async fn init_index<A: Api + ?Sized>(ctx: &Context<'_, A>, doc: &mut Document) {
    filter::setup(doc);
    fetch_places(ctx, doc).await;
}

pub async fn fetch_places<A: Api + ?Sized>(ctx: &Context<'_, A>, doc: &mut Document) {
    let html = match ctx.api.list_places(&ctx.session).await {
        Ok(places) => {
            let cards = place_cards(ctx, &places).await;
            if let Some(list) = doc.by_id_mut("places-list") {
                list.set_inner_html("");
                list.children = cards;
            }
            return;
        }
        Err(e) if e.is_rejection() => {
            warn!(error = %e, "places rejected");
            render::message("Error loading places.")
        }
        Err(e) => {
            warn!(error = %e, "places unavailable");
            render::message("API connection error.")
        }
    };
    if let Some(list) = doc.by_id_mut("places-list") {
        list.set_inner_html(html);
    }
}

/// One card per place, in list order, with at most `concurrency` places
/// being resolved at a time
pub async fn place_cards<A: Api + ?Sized>(ctx: &Context<'_, A>, places: &[Place]) -> Vec<Element> {
    stream::iter(places)
        .map(|place| async move {
            // A malformed amenity list reads as no amenities on a card
            let names = match place.amenity_ids() {
                Some(ids) => {
                    lookup::amenity_names(ctx.api, &ctx.session, ids, ctx.concurrency).await
                }
                None => AmenityNames::default(),
            };
            render::place_card(place, &AmenitySummary::Names(names))
        })
        .buffered(ctx.concurrency.max(1))
        .collect()
        .await
}

async fn init_place<A: Api + ?Sized>(ctx: &Context<'_, A>, doc: &mut Document, id: Option<&str>) {
    match id {
        Some(id) => fetch_place_details(ctx, doc, id).await,
        None => {
            if let Some(details) = doc.by_class_mut("place-details") {
                details.set_inner_html(render::message("Error loading place details."));
            }
        }
    }
    apply_review_form_gate(doc, &ctx.session);
}

pub async fn fetch_place_details<A: Api + ?Sized>(
    ctx: &Context<'_, A>,
    doc: &mut Document,
    id: &str,
) {
    match ctx.api.get_place(&ctx.session, id).await {
        Ok(place) => {
            display_place_details(ctx, doc, &place).await;
            display_reviews(ctx, doc, id).await;
        }
        Err(e) => {
            warn!(place_id = id, error = %e, "place details unavailable");
            if let Some(details) = doc.by_class_mut("place-details") {
                details.set_inner_html(place_error(&e));
            }
        }
    }
}

fn place_error(e: &ApiError) -> String {
    if e.is_rejection() {
        render::message("Error loading place details.")
    } else {
        render::message("API connection error.")
    }
}

pub async fn display_place_details<A: Api + ?Sized>(
    ctx: &Context<'_, A>,
    doc: &mut Document,
    place: &Place,
) {
    if doc.by_class("place-details").is_none() {
        return;
    }
    let html = place_details_html(ctx, place).await;
    if let Some(details) = doc.by_class_mut("place-details") {
        details.set_inner_html(html);
    }
}

/// The details block with host and amenity names resolved
async fn place_details_html<A: Api + ?Sized>(ctx: &Context<'_, A>, place: &Place) -> String {
    let owner = lookup::owner_name(ctx.api, &ctx.session, place).await;
    let amenities = match place.amenity_ids() {
        Some(ids) => AmenitySummary::Names(
            lookup::amenity_names(ctx.api, &ctx.session, ids, ctx.concurrency).await,
        ),
        None if place.has_malformed_amenities() => {
            warn!(place_id = %place.id, "amenities is not a list");
            AmenitySummary::Malformed
        }
        None => AmenitySummary::Names(AmenityNames::default()),
    };
    render::place_details(place, &owner, &amenities)
}

/// Reviews are resolved one after the other, each with its author's name
pub async fn display_reviews<A: Api + ?Sized>(
    ctx: &Context<'_, A>,
    doc: &mut Document,
    place_id: &str,
) {
    let Some(section) = doc.by_class_mut("reviews") else {
        return;
    };
    section.set_inner_html(render::message("Loading reviews..."));

    let reviews = lookup::place_reviews(ctx.api, &ctx.session, place_id).await;
    let mut cards = Vec::with_capacity(reviews.len());
    for review in &reviews {
        let author: Lookup<String> =
            lookup::user_name(ctx.api, &ctx.session, &review.user_id).await;
        cards.push(render::review_card(review, &author));
    }

    if let Some(section) = doc.by_class_mut("reviews") {
        if cards.is_empty() {
            section.set_inner_html(render::message("No reviews yet."));
        } else {
            section.set_inner_html("");
            section.children = cards;
        }
    }
}

async fn init_add_review<A: Api + ?Sized>(
    ctx: &Context<'_, A>,
    doc: &mut Document,
    id: Option<&str>,
) -> Outcome {
    if let Some(navigation) = require_session(&ctx.session) {
        return Outcome {
            alerts: Vec::new(),
            navigation: Some(navigation),
        };
    }
    let Some(id) = id else {
        return Outcome::alert("No place ID provided. Redirecting to home page.")
            .and_redirect(Route::Index.location());
    };
    let html = match ctx.api.get_place(&ctx.session, id).await {
        Ok(place) => place_details_html(ctx, &place).await,
        Err(e) => {
            warn!(place_id = id, error = %e, "place unavailable for review");
            place_error(&e)
        }
    };
    if let Some(info) = doc.by_id_mut("place-info") {
        info.set_inner_html(html);
    }
    Outcome::default()
}

/// Post a review. The form is only cleared when the server accepted it.
pub async fn submit_review<A: Api + ?Sized>(
    ctx: &Context<'_, A>,
    place_id: Option<&str>,
    form: &mut ReviewForm,
) -> Outcome {
    if !ctx.session.is_authenticated() {
        return Outcome::alert(
            "You must be logged in to submit a review. Redirecting to login page...",
        )
        .and_redirect(Route::Login.location());
    }
    let Some(place_id) = place_id else {
        return Outcome::alert("No place ID provided.");
    };
    let Some(rating) = form.rating().filter(|_| !form.text.trim().is_empty()) else {
        return Outcome::alert("Please fill in all fields.");
    };

    let review = NewReview {
        text: &form.text,
        rating,
        place_id,
    };
    let result = ctx.api.create_review(&ctx.session, &review).await;
    match result {
        Ok(created) => {
            let review_id = created.map(|review| review.id);
            info!(?review_id, place_id, "review submitted");
            form.reset();
            Outcome::alert("Review submitted successfully!").and_redirect(
                Route::Place {
                    id: Some(place_id.to_string()),
                }
                .location(),
            )
        }
        Err(ApiError::Unauthenticated) => Outcome::alert(
            "You must be logged in to submit a review. Redirecting to login page...",
        )
        .and_redirect(Route::Login.location()),
        Err(e) if e.is_rejection() => Outcome::alert(format!("Failed to submit review: {e}")),
        Err(e) => {
            warn!(error = %e, "review submission failed");
            Outcome::alert("API connection error")
        }
    }
}

pub async fn login_user<A: Api + ?Sized>(
    api: &A,
    store: &Store,
    email: &str,
    password: &str,
) -> Result<Outcome, StoreError> {
    if email.is_empty() || password.is_empty() {
        return Ok(Outcome::alert("Please fill in all fields."));
    }
    match api.login(email, password).await {
        Ok(login) => {
            session::login(store, &login.access_token)?;
            info!(email, "logged in");
            Ok(Outcome::redirect(Route::Index.location()))
        }
        Err(e) if e.is_rejection() => Ok(Outcome::alert(format!("Login failed: {e}"))),
        Err(e) => {
            warn!(error = %e, "login failed");
            Ok(Outcome::alert("Login failed: API connection error"))
        }
    }
}

/// Drop the session cookie and load the page again from scratch
pub fn logout(store: &Store) -> Result<Outcome, StoreError> {
    session::logout(store)?;
    info!("logged out");
    Ok(Outcome {
        alerts: Vec::new(),
        navigation: Some(Navigation::Reload),
    })
}
