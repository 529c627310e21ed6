pub mod csv_loader;

pub use csv_loader::{load_unit_file, scan_unit_folder};
