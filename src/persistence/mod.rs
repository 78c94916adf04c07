pub mod cycle;
pub mod service;

pub use cycle::SaveCycle;
pub use service::PersistenceService;
