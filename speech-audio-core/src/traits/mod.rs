pub mod audio_buffer;
pub mod audio_processor;
pub mod audio_pump;
pub mod fan_out_delegate;
pub mod site;
pub mod stream_reader;
