pub mod audit_log;
pub mod evaluation;
pub mod message;
pub mod prequal_config;
pub mod response;
pub mod resume;
pub mod session;
pub mod vacancy;
pub mod workspace;
