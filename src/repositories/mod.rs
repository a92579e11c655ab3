pub mod memory;
pub mod note;

pub use memory::InMemoryNoteRepository;
pub use note::{MongoNoteRepository, NoteRepository, NoteUpdate};
