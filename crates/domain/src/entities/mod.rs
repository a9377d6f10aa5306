pub mod position;
pub mod share;

// Re-export for easier access
pub use position::Position;
pub use share::Share;
