use std::fs;
use std::path::PathBuf;

use api::{Api, ApiError, HttpApi};
use clap::{Parser, Subcommand};
use config::Config;
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};
use filter::{PriceFilter, PRICE_OPTIONS};
use page::Document;
use pages::{Action, Context, Navigation, ReviewForm, Route};
use session::Session;
use store::{Store, StoreError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod filter;
mod lookup;
mod page;
mod pages;
mod render;
mod session;
mod store;
mod types;

/// Redirects and reloads followed before giving up on a command
const MAX_NAVIGATIONS: usize = 8;

#[derive(Parser)]
#[command(name = "hbnb")]
#[command(version = "0.1.0")]
#[command(about = "Browse and review HBnB places from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[command(flatten)]
    config: Config,
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Write the rendered page here instead of stdout
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List places (index.html)
    Index {
        /// Hide places above this price
        #[arg(long)]
        price: Option<PriceFilter>,
        /// Pick the price ceiling from a menu
        #[arg(long, conflicts_with = "price")]
        choose_price: bool,
    },
    /// Show a place with its reviews (place.html)
    Place {
        id: String,
        /// Post this review from the place page
        #[arg(long, requires = "rating")]
        review: Option<String>,
        #[arg(long, requires = "review")]
        rating: Option<String>,
    },
    /// Review a place (add_review.html)
    AddReview {
        id: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        rating: Option<String>,
    },
    /// Log in and keep the session token
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "HBNB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the session token
    Logout,
}

#[derive(Debug, thiserror::Error)]
pub enum HbnbError {
    #[error(transparent)]
    Network(#[from] ApiError),
    #[error(transparent)]
    Database(#[from] StoreError),
    #[error("no home directory for the cookie jar, use --db")]
    NoHomeDir,
    #[error("cannot navigate to {0}")]
    UnknownLocation(String),
    #[error("too many redirects")]
    TooManyRedirects,
    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the user asked for on the command line, before any prompting
enum Pending {
    Login {
        email: Option<String>,
        password: Option<String>,
    },
    Review {
        text: Option<String>,
        rating: Option<String>,
    },
    Filter {
        price: Option<PriceFilter>,
        choose: bool,
    },
    Logout,
}

impl Command {
    fn into_request(self) -> (Route, Option<Pending>) {
        match self {
            Command::Index {
                price,
                choose_price,
            } => (
                Route::Index,
                Some(Pending::Filter {
                    price,
                    choose: choose_price,
                }),
            ),
            Command::Place { id, review, rating } => (
                Route::Place { id: Some(id) },
                review.map(|text| Pending::Review {
                    text: Some(text),
                    rating,
                }),
            ),
            Command::AddReview { id, text, rating } => (
                Route::AddReview { id },
                Some(Pending::Review { text, rating }),
            ),
            Command::Login { email, password } => {
                (Route::Login, Some(Pending::Login { email, password }))
            }
            Command::Logout => (Route::Index, Some(Pending::Logout)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), HbnbError> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let db_path = args.config.db_path().ok_or(HbnbError::NoHomeDir)?;
    let store = Store::new(&db_path.to_string_lossy())?;
    let api = HttpApi::new(&args.config.api_url, args.config.timeout())?;

    let mut browser = Browser::new(&api, &store, &args.config);
    let (route, pending) = args.command.into_request();
    let action = match pending {
        Some(pending) => prepare(pending, &route, &browser.session()?)?,
        None => None,
    };
    let result = browser.open(route, action).await;
    for alert in &browser.alerts {
        eprintln!("{alert}");
    }

    let html = result?.render();
    match &args.out {
        Some(path) => fs::write(path, html)?,
        None => print!("{html}"),
    }
    Ok(())
}

/// Follows a page's redirects and reloads until one of them settles
struct Browser<'a, A: Api + ?Sized> {
    api: &'a A,
    store: &'a Store,
    /// `Cookie:` header standing in for the jar until the jar is written to
    cookie: Option<String>,
    concurrency: usize,
    max_navigations: usize,
    alerts: Vec<String>,
}

impl<'a, A: Api + ?Sized> Browser<'a, A> {
    fn new(api: &'a A, store: &'a Store, config: &Config) -> Self {
        Browser {
            api,
            store,
            cookie: config.cookie.clone(),
            concurrency: config.concurrency(),
            max_navigations: MAX_NAVIGATIONS,
            alerts: Vec::new(),
        }
    }

    /// Every page load starts from whatever the cookie says now
    fn session(&self) -> Result<Session, StoreError> {
        match &self.cookie {
            Some(header) => Ok(Session::from_cookie_header(header)),
            None => Session::load(self.store),
        }
    }

    /// Load `route`, replay `action` on it and follow where it leads
    async fn open(
        &mut self,
        mut route: Route,
        mut action: Option<Action>,
    ) -> Result<Document, HbnbError> {
        for _ in 0..=self.max_navigations {
            let writes_cookie = matches!(action, Some(Action::Login { .. } | Action::Logout));
            let ctx = Context {
                api: self.api,
                store: self.store,
                session: self.session()?,
                concurrency: self.concurrency,
            };
            let page = pages::run(&ctx, &route, action.take()).await?;
            self.alerts.extend(page.outcome.alerts);

            let Some(navigation) = page.outcome.navigation else {
                return Ok(page.document);
            };
            if writes_cookie && self.cookie.take().is_some() {
                debug!("cookie jar now holds the session");
            }
            match navigation {
                Navigation::Redirect(location) => {
                    info!(%location, "redirect");
                    route = Route::from_location(&location)
                        .ok_or(HbnbError::UnknownLocation(location))?;
                }
                Navigation::Reload => debug!(?route, "reload"),
            }
        }
        Err(HbnbError::TooManyRedirects)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "hbnb=debug" } else { "hbnb=warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

/// Turn a pending request into an action, asking for whatever is missing.
/// Nothing is asked when the page is going to send the user away anyway.
fn prepare(
    pending: Pending,
    route: &Route,
    session: &Session,
) -> Result<Option<Action>, HbnbError> {
    let theme = ColorfulTheme::default();
    let action = match pending {
        Pending::Logout => Action::Logout,
        Pending::Login { email, password } => {
            let email = match email {
                Some(email) => email,
                None => Input::with_theme(&theme)
                    .with_prompt("Email")
                    .interact_text()?,
            };
            let password = match password {
                Some(password) => password,
                None => Password::with_theme(&theme)
                    .with_prompt("Password")
                    .interact()?,
            };
            Action::Login { email, password }
        }
        Pending::Review { text, rating } => {
            let has_place = matches!(
                route,
                Route::Place { id: Some(_) } | Route::AddReview { id: Some(_) }
            );
            let mut form = ReviewForm {
                text: text.unwrap_or_default(),
                rating: rating.unwrap_or_default(),
            };
            if session.is_authenticated() && has_place {
                if form.text.is_empty() {
                    form.text = Input::with_theme(&theme)
                        .with_prompt("Review")
                        .interact_text()?;
                }
                if form.rating.is_empty() {
                    let ratings = ["1", "2", "3", "4", "5"];
                    let picked = Select::with_theme(&theme)
                        .with_prompt("Rating")
                        .items(&ratings)
                        .default(4)
                        .interact()?;
                    form.rating = ratings[picked].to_string();
                }
            }
            Action::Review(form)
        }
        Pending::Filter { price, choose } => {
            let price = match (price, choose) {
                (Some(price), _) => price,
                (None, true) => {
                    let picked = Select::with_theme(&theme)
                        .with_prompt("Max price")
                        .items(&PRICE_OPTIONS)
                        .default(0)
                        .interact()?;
                    PRICE_OPTIONS[picked]
                }
                (None, false) => PriceFilter::All,
            };
            Action::Filter(price)
        }
    };
    Ok(Some(action))
}
