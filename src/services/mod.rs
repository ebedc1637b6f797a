pub mod ai_service;
pub mod audit_service;
pub mod dialogue_handler;
pub mod evaluator_service;
pub mod feedback_service;
pub mod prequal_service;
pub mod session_manager;
pub mod tenant_guard;
