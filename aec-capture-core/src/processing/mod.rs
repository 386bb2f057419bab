pub mod atomic_stats;
pub mod frame_queue;
pub mod levels;
pub mod pcm;
pub mod wav_format;
