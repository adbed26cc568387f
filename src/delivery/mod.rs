pub mod handlers;
pub mod middleware;
pub mod range;
pub mod responder;
pub mod router;

pub use responder::{serve, MediaResponse};
pub use router::{build_router, AppState};
