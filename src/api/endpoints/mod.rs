pub mod health;
pub mod infer;
