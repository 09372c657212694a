pub mod primitives;
pub mod validator;
pub mod block;
pub mod ibc;

pub use primitives::*;
pub use validator::*;
pub use block::*;
pub use ibc::*;
