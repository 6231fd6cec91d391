pub mod store_date;
