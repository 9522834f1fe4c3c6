pub mod name_generator;

pub use name_generator::NameGenerator;
