pub mod job_scheduler_service;
pub mod price_service;
