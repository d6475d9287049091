pub mod helpers;

pub use helpers::{RecordingNotifier, RecordingStore, StaticAuthProvider, StoreCall};
