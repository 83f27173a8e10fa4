pub mod assessment;
pub mod attempt;
pub mod user;
