mod repository;

pub use repository::IdentityStore;
