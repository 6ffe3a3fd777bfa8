//! qdesk Client - HTTP implementation of the SQL endpoint contract
//!
//! Talks to the REST endpoint that owns the remote SQL connections:
//!
//! ```text
//! POST   {base}/connections                 open (201 + {"data": {"id": ..}})
//! DELETE {base}/connections/{id}            close
//! POST   {base}/connections/{id}/queries    execute ({"sql": ..})
//! GET    {base}/{type}?fields[{type}]=id    list targets
//! ```

mod http;
mod wire;

pub use http::HttpEndpoint;
