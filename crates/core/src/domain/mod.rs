pub mod alert;
pub mod records;
