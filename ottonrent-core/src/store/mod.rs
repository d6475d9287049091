pub mod firebase;
pub mod memory;
pub mod sse;
pub mod tree;

pub use firebase::FirebaseRestStore;
pub use memory::InMemoryStore;
