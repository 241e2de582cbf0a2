pub mod report;
pub mod system;
pub mod terminal;
