pub mod report_writer;
pub mod room_reader;
