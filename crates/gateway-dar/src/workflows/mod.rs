pub mod data_access;
