// =============================================================================
// ottonrent-core/src/auth/mod.rs
//   Session state for the dashboard and the Supabase-backed auth provider.
// =============================================================================

pub mod session_manager;
pub mod supabase;

pub use session_manager::{SessionManager, SessionState};
pub use supabase::SupabaseAuth;
