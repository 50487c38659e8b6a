pub mod conversation_service;
pub mod discovery_service;
pub mod matching_service;
pub mod profile_service;
pub mod safety_service;
