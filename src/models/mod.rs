pub mod device;
pub mod endpoint;
pub mod group;
pub mod hierarchy;
pub mod location;
pub mod protocol;
pub mod token;
pub mod user;

pub use device::Device;
pub use endpoint::CaptureEndpoint;
pub use group::{Group, VIRTUAL_PREFIX};
pub use hierarchy::{GroupHierarchy, HierarchyError};
pub use location::WifiMacLocation;
pub use protocol::Protocol;
pub use token::ApiToken;
pub use user::User;
