//! HTTP layer: handlers, middleware, DTOs and the router.

mod doc;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
