pub mod auth_traits;
pub mod entity_traits;
pub mod store_traits;

pub use auth_traits::{AuthProvider, AuthSession};
pub use entity_traits::{Entity, Validate};
pub use store_traits::{RemoteStore, Snapshot, Subscription};
