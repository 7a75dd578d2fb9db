//! A small element tree standing in for the browser DOM.
//!
//! Each page starts from a fixed layout (the markup the pages ship with) and
//! the page logic only ever looks elements up by id or class, replaces their
//! contents and toggles their visibility, the same surface the client used in
//! the browser.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::render::escape;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Default,
    Block,
    None,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub display: Display,
    /// Raw inner markup, emitted before `children`
    pub html: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Element {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.display = Display::None;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Replace everything inside the element, like assigning `innerHTML`
    pub fn set_inner_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
        self.children.clear();
    }

    /// Inner markup including children
    pub fn inner_html(&self) -> String {
        let mut out = self.html.clone();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    pub fn is_visible(&self) -> bool {
        self.display != Display::None
    }

    fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }

    fn find_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(pred))
    }

    fn collect<'a>(&'a self, pred: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
        if pred(self) {
            out.push(self);
        }
        for child in &self.children {
            child.collect(pred, out);
        }
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    fn insert_after(
        &mut self,
        pred: &dyn Fn(&Element) -> bool,
        new: Element,
    ) -> Result<(), Element> {
        if let Some(pos) = self.children.iter().position(pred) {
            self.children.insert(pos + 1, new);
            return Ok(());
        }
        let mut new = new;
        for child in &mut self.children {
            match child.insert_after(pred, new) {
                Ok(()) => return Ok(()),
                Err(back) => new = back,
            }
        }
        Err(new)
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        if let Some(id) = &self.id {
            let _ = write!(out, r#" id="{}""#, escape(id));
        }
        if !self.classes.is_empty() {
            let _ = write!(out, r#" class="{}""#, escape(&self.classes.join(" ")));
        }
        for (name, value) in &self.attrs {
            let _ = write!(out, r#" {}="{}""#, name, escape(value));
        }
        match self.display {
            Display::Default => {}
            Display::Block => out.push_str(r#" style="display: block""#),
            Display::None => out.push_str(r#" style="display: none""#),
        }
        out.push('>');
        if is_void(&self.tag) {
            return;
        }
        out.push_str(&self.inner_html());
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "input" | "br" | "hr" | "meta" | "link")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub body: Element,
}

impl Document {
    pub fn new(title: &str, main: Vec<Element>) -> Self {
        let mut body = Element::new("body").child(header());
        body.children
            .push(main.into_iter().fold(Element::new("main"), Element::child));
        Document {
            title: title.to_string(),
            body,
        }
    }

    pub fn by_id(&self, id: &str) -> Option<&Element> {
        self.body.find(&|e| e.id.as_deref() == Some(id))
    }

    pub fn by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.body.find_mut(&|e| e.id.as_deref() == Some(id))
    }

    /// First element carrying `class`, like `querySelector(".class")`
    pub fn by_class(&self, class: &str) -> Option<&Element> {
        self.body.find(&|e| e.has_class(class))
    }

    pub fn by_class_mut(&mut self, class: &str) -> Option<&mut Element> {
        self.body.find_mut(&|e| e.has_class(class))
    }

    pub fn all_by_class(&self, class: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.body.collect(&|e| e.has_class(class), &mut out);
        out
    }

    pub fn for_each_by_class(&mut self, class: &str, mut f: impl FnMut(&mut Element)) {
        self.body.visit_mut(&mut |e| {
            if e.has_class(class) {
                f(e)
            }
        });
    }

    /// Insert `new` right after the first element carrying `class`
    pub fn insert_after_class(&mut self, class: &str, new: Element) -> bool {
        self.body.insert_after(&|e| e.has_class(class), new).is_ok()
    }

    pub fn render(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        out.push_str("<meta charset=\"UTF-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape(&self.title));
        out.push_str("<link rel=\"stylesheet\" href=\"styles.css\">\n</head>\n");
        self.body.write_html(&mut out);
        out.push_str("\n</html>\n");
        out
    }

    /// `index.html`
    pub fn index() -> Self {
        Document::new(
            "HBnB",
            vec![
                Element::new("section").id("filter").child(
                    Element::new("label")
                        .attr("for", "price-filter")
                        .html("Max price:"),
                )
                .child(Element::new("select").id("price-filter")),
                Element::new("section").id("places-list"),
            ],
        )
    }

    /// `place.html`
    pub fn place() -> Self {
        Document::new(
            "HBnB - Place",
            vec![
                Element::new("section").class("place-details"),
                Element::new("section").class("reviews"),
                Element::new("section")
                    .class("add-review")
                    .child(Element::new("h2").html("Add a Review"))
                    .child(review_form()),
            ],
        )
    }

    /// `add_review.html`
    pub fn add_review() -> Self {
        Document::new(
            "HBnB - Add Review",
            vec![
                Element::new("section").id("place-info"),
                Element::new("section")
                    .class("add-review")
                    .child(Element::new("h2").html("Add a Review"))
                    .child(review_form()),
            ],
        )
    }

    /// `login.html`
    pub fn login() -> Self {
        Document::new(
            "HBnB - Login",
            vec![Element::new("form")
                .id("login-form")
                .child(
                    Element::new("input")
                        .id("email")
                        .attr("type", "email")
                        .attr("name", "email"),
                )
                .child(
                    Element::new("input")
                        .id("password")
                        .attr("type", "password")
                        .attr("name", "password"),
                )
                .child(
                    Element::new("button")
                        .attr("type", "submit")
                        .class("login-button")
                        .html("Login"),
                )],
        )
    }
}

fn header() -> Element {
    Element::new("header")
        .child(
            Element::new("a")
                .attr("href", "index.html")
                .child(
                    Element::new("img")
                        .class("logo")
                        .attr("src", "images/logo.png")
                        .attr("alt", "HBnB"),
                ),
        )
        .child(
            Element::new("a")
                .id("login-link")
                .class("login-button")
                .attr("href", "login.html")
                .html("Login"),
        )
        .child(
            Element::new("button")
                .id("logout-button")
                .class("login-button")
                .html("Logout")
                .hidden(),
        )
}

fn review_form() -> Element {
    let rating = (1..=5).fold(
        Element::new("select").id("rating").attr("name", "rating"),
        |select, n| {
            let n = n.to_string();
            select.child(Element::new("option").attr("value", &n).html(n.clone()))
        },
    );
    Element::new("form")
        .id("review-form")
        .child(Element::new("textarea").id("review-text").attr("name", "review-text"))
        .child(rating)
        .child(Element::new("button").attr("type", "submit").html("Submit Review"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_carry_the_expected_hooks() {
        let index = Document::index();
        assert!(index.by_id("places-list").is_some());
        assert!(index.by_id("price-filter").is_some());
        assert!(index.by_id("login-link").is_some());
        assert!(!index.by_id("logout-button").unwrap().is_visible());

        let place = Document::place();
        assert!(place.by_class("place-details").is_some());
        assert!(place.by_class("reviews").is_some());
        assert!(place.by_id("review-form").is_some());

        assert!(Document::add_review().by_id("place-info").is_some());
        assert!(Document::login().by_id("login-form").is_some());
    }

    #[test]
    fn inner_html_replaces_children() {
        let mut doc = Document::index();
        let list = doc.by_id_mut("places-list").unwrap();
        list.children.push(Element::new("div").class("place-card"));
        list.set_inner_html("<p>Error loading places.</p>");
        assert!(doc.all_by_class("place-card").is_empty());
        assert_eq!(
            doc.by_id("places-list").unwrap().inner_html(),
            "<p>Error loading places.</p>"
        );
    }

    #[test]
    fn insert_after_and_render() {
        let mut doc = Document::place();
        let inserted = doc.insert_after_class(
            "add-review",
            Element::new("div").id("login-message").class("add-review"),
        );
        assert!(inserted);
        let html = doc.render();
        let form = html.find(r#"id="review-form""#).unwrap();
        let message = html.find(r#"id="login-message""#).unwrap();
        assert!(message > form);
        assert!(html.contains(
            r#"<button id="logout-button" class="login-button" style="display: none">Logout</button>"#
        ));
        assert!(!doc.insert_after_class("missing", Element::new("p")));
    }

    #[test]
    fn class_visits_reach_nested_elements() {
        let mut doc = Document::index();
        let list = doc.by_id_mut("places-list").unwrap();
        for price in ["5", "10"] {
            list.children
                .push(Element::new("div").class("place-card").attr("data-price", price));
        }
        doc.for_each_by_class("place-card", |card| card.display = Display::None);
        assert!(doc
            .all_by_class("place-card")
            .iter()
            .all(|card| !card.is_visible()));
    }
}
