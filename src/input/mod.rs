//! Input processing module
//! Handles file detection, text extraction, contact extraction and document sources

pub mod candidate;
pub mod file_detector;
pub mod manager;
pub mod source;
pub mod text_extractor;

pub use candidate::{extract_contact, Candidate, CONTACT_NOT_FOUND};
pub use manager::InputManager;
pub use source::{collect_documents, CandidateDocument, CleanupPolicy, DocumentSource, FileDocumentSource};
