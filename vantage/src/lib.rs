pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    OutputFormat, RecordCommand, collect_names, database_path, load_names_from_file,
    parse_name_line, parse_since, render_pairs,
};
