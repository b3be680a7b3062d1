pub mod admission;
pub mod request_id;

pub use admission::AdmissionControl;
pub use request_id::assign_request_id;
