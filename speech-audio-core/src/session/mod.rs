pub mod client_reader;
pub mod single_to_many;
