pub mod device;
pub mod error;

pub use device::{classify_user_agent, DeviceClass};
pub use error::ApiError;
