pub mod customer;
pub mod customer_token;
pub mod manager;
pub mod manager_token;
pub mod product;
pub mod sale;
pub mod sale_position;
