pub mod buffer_properties;
pub mod buffer_writer;
pub mod pump;
pub mod source_buffer;
pub mod wav_format;
