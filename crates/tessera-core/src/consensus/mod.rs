pub mod commit;
pub mod store;
pub mod light_client;
pub mod sync;

pub use commit::*;
pub use store::*;
pub use light_client::*;
pub use sync::*;
