pub mod ask;
pub mod chat;
pub mod history;
pub mod init;
pub mod runtime;
pub mod status;
