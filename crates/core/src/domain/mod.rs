pub mod customer;
pub mod menu;
pub mod order;
pub mod survey;
pub mod visit;
