//! Domain action routes that sit beside the generic CRUD routes

pub mod billing;
pub mod inventory;
pub mod leads;
pub mod scheduling;

use super::host::ServerHost;
use axum::Router;

/// Every action route, unmerged with CRUD
pub fn action_routes() -> Router<ServerHost> {
    Router::new()
        .merge(billing::routes())
        .merge(scheduling::routes())
        .merge(inventory::routes())
        .merge(leads::routes())
}
