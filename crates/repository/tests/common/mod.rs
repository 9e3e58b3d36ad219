pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{TestRepository, loan_documents};
