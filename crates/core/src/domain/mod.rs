pub mod chat;
pub mod vendor;
