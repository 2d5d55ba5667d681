pub mod connection;

pub use connection::connect_to_interview_page;
