pub mod reconciler;
pub mod scheduler;
pub mod update_service;

pub use scheduler::RefreshScheduler;
pub use update_service::UpdateService;
