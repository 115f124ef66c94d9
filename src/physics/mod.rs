pub mod blast;
pub mod crater;
pub mod thermal;
