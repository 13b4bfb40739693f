pub mod powered_by;
pub mod request_id;
pub mod running;

pub use powered_by::{GATEWAY_BUILD, POWERED_BY_HEADER, powered_by_middleware};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use running::require_running;
