// Routes module - organizes all HTTP route handlers

pub mod election;

use rocket::serde::json::Json;

use crate::error::ErrorBody;

// The API reports every failure as a 200 envelope; the catchers keep that
// contract for requests Rocket rejects before a handler runs.

#[catch(400)]
pub fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("Solicitud inválida"))
}

#[catch(404)]
pub fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody::new("Ruta no encontrada"))
}

#[catch(422)]
pub fn unprocessable() -> Json<ErrorBody> {
    Json(ErrorBody::new("Solicitud inválida"))
}

#[catch(500)]
pub fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new("Error interno"))
}
