mod refresh_transport_http;

pub use refresh_transport_http::*;
