use crate::db::{DbPool, OrmConn};
use crate::events::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub events: EventBus,
}
