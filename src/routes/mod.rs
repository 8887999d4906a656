pub mod docs;
pub mod secure;
pub mod system;
