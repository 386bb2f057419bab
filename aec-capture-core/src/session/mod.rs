mod collector;
pub mod orchestrator;
