//! Repositories sit between handlers and the [`Provider`](crate::provider::Provider).
//!
//! They are the only place where provider rows are turned into domain
//! entities and back.

pub mod discussions;
pub mod exams;
pub mod profiles;

pub use discussions::DiscussionRepository;
pub use exams::ExamRepository;
pub use profiles::ProfileRepository;
