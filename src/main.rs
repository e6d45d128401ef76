#[macro_use]
extern crate rocket;

use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;
use tracing_subscriber::EnvFilter;

use config::{Settings, Storage};

pub mod config;
pub mod error;
pub mod export;
pub mod links;
pub mod listing;
pub mod models;
pub mod notify;
pub mod rsvp;
pub mod schema;
pub mod store;
pub mod summary;
pub mod token;

#[cfg(test)]
mod testing;

pub fn app(figment: Figment) -> Rocket<Build> {
    let storage = figment
        .extract_inner::<Storage>("storage")
        .unwrap_or_default();

    rocket::custom(figment)
        .mount("/", rsvp::routes())
        .mount("/", summary::routes())
        .attach(Template::fairing())
        .attach(AdHoc::config::<Settings>())
        .attach(store::stage(storage))
}

#[launch]
fn rocket() -> _ {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    app(rocket::Config::figment())
}
