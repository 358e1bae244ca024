mod allocations;
mod departments;
mod resource_detail;
mod resources;
mod sign_in;
mod transfers;

pub use allocations::AllocationsView;
pub use departments::DepartmentsView;
pub use resource_detail::ResourceDetailView;
pub use resources::ResourcesView;
pub use sign_in::SignInView;
pub use transfers::TransfersView;
