//! Pure helpers: filename sanitation and currency conversion.

mod filename;
mod money;

pub use filename::sanitize_filename;
pub use money::to_minor_units;
