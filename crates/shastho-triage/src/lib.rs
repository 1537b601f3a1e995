//! Symptom triage — classifies complaints into a specialty, runs the
//! persona-scripted consultation chat, and extracts structured reports.

pub mod chat;
pub mod classify;
pub mod client;
pub mod personas;
pub mod report;

pub use chat::ChatSession;
pub use classify::{classify, Classification};
pub use client::GeminiClient;
pub use personas::{specialist, Specialist, SpecialistId};
pub use report::generate_report;
