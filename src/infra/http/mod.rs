mod middleware;
mod public;

pub use public::{HttpState, build_router};

const DATASTAR_REQUEST_HEADER: &str = "datastar-request";
