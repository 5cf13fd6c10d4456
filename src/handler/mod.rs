pub mod admin;
pub mod orders;
pub mod payments;
pub mod wallet;
