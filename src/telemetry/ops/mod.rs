pub mod init;
pub mod ingest;
pub mod summarize;
