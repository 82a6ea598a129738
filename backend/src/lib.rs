// School elections backend: mesa session issuance, voter verification,
// anonymous ballot casting and admin tallying over PostgreSQL.

#[macro_use]
extern crate rocket;

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod schema;

use rocket::fairing::AdHoc;
use rocket::fs::FileServer;
use rocket::{Build, Rocket};
use rocket_db_pools::Database;

use config::AppConfig;
use db::ElectionsDb;
use routes::election::{admin, client};

/// Assemble the Rocket application: configuration, pool, migrations,
/// seeding, API routes, static front-end and catchers.
pub fn server() -> Rocket<Build> {
    let app_config = AppConfig::load();
    let static_dir = app_config.static_dir.clone();

    let figment = rocket::config::Config::figment()
        .merge(("port", app_config.rocket_port))
        .merge((
            "databases.elections_db",
            rocket_db_pools::Config {
                url: app_config.database_url.clone(),
                min_connections: None,
                max_connections: 64,
                connect_timeout: 3,
                idle_timeout: None,
                extensions: None,
            },
        ));

    rocket::custom(figment)
        .attach(ElectionsDb::init())
        .attach(AdHoc::on_ignite("Database Migrations", db::run_migrations))
        .attach(AdHoc::on_ignite("Demo Seed Data", db::run_seeding))
        .manage(app_config)
        .mount(
            "/api",
            routes![
                client::mesa_login,
                client::voter_verify,
                client::cast_vote,
                client::mesa_ledger,
                admin::results,
            ],
        )
        .mount("/", FileServer::from(static_dir))
        .register(
            "/",
            catchers![
                routes::bad_request,
                routes::not_found,
                routes::unprocessable,
                routes::internal_error,
            ],
        )
}
