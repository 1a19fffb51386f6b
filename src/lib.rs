pub mod call;
pub mod core;
pub mod institution;
pub mod security;
pub mod storage;
pub mod users;
