pub mod brand;
pub mod generate;
