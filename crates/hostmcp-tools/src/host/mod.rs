//! Host collaborators: an in-process operation table and an HTTP client
//! for hosts reached over the network.

mod http;
mod table;

pub use http::{HttpHost, ROUTES, Route};
pub use table::{FnOperation, OperationTable};
