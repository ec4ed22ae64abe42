#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::api::catchers;
use crate::config::{Config, ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::store::SharedStore;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod membership;
pub mod model;
pub mod store;
pub mod tally;

/// Build the server, loading config and connecting to the store on ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", catchers())
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(LoggerFairing)
}

/// Build the server around an existing store and config.
pub fn rocket_for_store(store: SharedStore, config: Config) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", catchers())
        .manage(store)
        .manage(config)
        .attach(LoggerFairing)
}
