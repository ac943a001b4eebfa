pub mod health;
pub mod localai;
