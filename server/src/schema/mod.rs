mod character_table;
mod finca_table;
mod presence_settings_table;

pub use character_table::*;
pub use finca_table::*;
pub use presence_settings_table::*;
