/// Binary vulnerability classification of source functions
pub mod text_classification;
