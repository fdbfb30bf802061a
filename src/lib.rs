pub mod db;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod ident;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod settings;
