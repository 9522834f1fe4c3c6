// alaris-core/src/auth/mod.rs

pub mod admin_list;

pub use admin_list::AdminList;
