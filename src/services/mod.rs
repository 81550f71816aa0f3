pub mod badge;
pub mod badge_store;
pub mod cloudinary;
pub mod event_repo;
pub mod local_store;
pub mod sessions;
pub mod verification;

#[cfg(test)]
pub mod testing;

pub use badge_store::*;
pub use cloudinary::*;
pub use event_repo::*;
pub use local_store::*;
pub use sessions::*;
pub use verification::*;
