mod simple;
pub mod v1;
