mod checkpoint;
mod io;
mod layout;
mod matrix;
mod memory;
mod permutation;
mod vector;

use std::path::PathBuf;

fn data_output_path() -> PathBuf {
    PathBuf::from("data/unit_tests/")
}
