// Main application entry point

use tracing_subscriber::{fmt, EnvFilter};

#[rocket::launch]
fn rocket() -> _ {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    elections_backend::server()
}
