pub mod errors;
pub mod db;
pub mod user;
pub mod shop;
pub mod product;
pub mod cart_item;
pub mod order;
pub mod order_item;
