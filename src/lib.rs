//! FluxoÁgil: single-business "take-a-number" queue service.
//!
//! Clients take sequential tickets for a company's service line, an admin
//! calls and finishes them, and a public display shows the ticket being
//! served. State lives in an embedded Sled database, one record per company
//! id; every write publishes a change notice that WebSocket watchers relay
//! to the screens.

pub mod auth;
pub mod events;
pub mod models;
pub mod profile;
pub mod queue;
pub mod rest;
pub mod storage;
