//! WebSocket push notifications (C14's transport edge): each connection
//! forwards exactly one team's event stream, published by `EventPublisher`.

pub mod handler;

pub use handler::ws_handler;
