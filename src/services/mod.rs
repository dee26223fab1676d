pub mod export;
pub mod extraction;
pub mod messaging;
pub mod mirror;
pub mod supabase;
pub mod telegram;
