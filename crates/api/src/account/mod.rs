mod calendars;
mod connect_account;

use actix_web::web;
use calendars::{get_calendars_controller, select_calendars_controller};
use connect_account::connect_account_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/accounts/connect", web::post().to(connect_account_controller))
        .route(
            "/accounts/{account_id}/calendars",
            web::get().to(get_calendars_controller),
        )
        .route(
            "/accounts/{account_id}/calendars/selection",
            web::put().to(select_calendars_controller),
        );
}
