mod create_event_type;
mod delete_event_type;
mod get_event_type;
mod update_event_type;

use actix_web::web;
use create_event_type::create_event_type_controller;
use delete_event_type::delete_event_type_controller;
use get_event_type::{get_event_type_controller, get_event_types_controller};
use update_event_type::update_event_type_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/event-types", web::post().to(create_event_type_controller))
        .route("/event-types", web::get().to(get_event_types_controller))
        .route(
            "/event-types/{event_type_id}",
            web::get().to(get_event_type_controller),
        )
        .route(
            "/event-types/{event_type_id}",
            web::put().to(update_event_type_controller),
        )
        .route(
            "/event-types/{event_type_id}",
            web::delete().to(delete_event_type_controller),
        );
}
