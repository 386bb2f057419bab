pub mod audio_engine;
pub mod capture_delegate;
