//! Data models for the imported dataset.
//!
//! - Title, Rating, Episode
//! - Person, Crew
//! - Aka

pub mod aka;
pub mod person;
pub mod title;

pub use aka::Aka;
pub use person::{Crew, Person};
pub use title::{Episode, Rating, Title};
