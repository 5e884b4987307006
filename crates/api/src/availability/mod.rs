mod busy;
mod get_availability;
mod slot_check;

use actix_web::web;
pub(crate) use busy::fetch_busy_snapshot;
use get_availability::get_availability_controller;
#[cfg(test)]
pub(crate) use get_availability::GetAvailabilityUseCase;
pub(crate) use slot_check::is_slot_bookable;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/availability", web::get().to(get_availability_controller));
}
