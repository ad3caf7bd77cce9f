pub mod admin;
pub mod health;
pub mod judge;
pub mod submission;
pub mod test_case;
