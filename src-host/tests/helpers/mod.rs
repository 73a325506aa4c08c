pub mod fake_worker;
pub mod polling;
