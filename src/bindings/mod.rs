mod wrapper;

pub use wrapper::PyFringes;

use pyo3::prelude::*;
use pyo3::types::PyModule;

/// fringes - phase shifting fringe pattern coding
#[pymodule]
pub fn fringes(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    wrapper::register(m)?;
    Ok(())
}
