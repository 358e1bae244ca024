pub mod header;
pub mod utils;

pub use header::draw_header;
pub use utils::{priority_color, request_status_color, resource_status_color, truncate};
