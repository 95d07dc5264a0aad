pub mod customers;
pub mod managers;
pub mod products;
pub mod sales;
