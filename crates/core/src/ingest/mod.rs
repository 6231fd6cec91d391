pub mod backup;
pub mod historical;
pub mod sheet;
