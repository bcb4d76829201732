use crate::error::FringesError;
use crate::decoding::{gamma_auto_correct as linearize, height as integrate};
use crate::{DecodeOptions, EncodeOptions, FramePattern, Fringes, Update};
use ndarray::Array4;
use numpy::{Element, IntoPyArray, PyArray3, PyArray4, PyReadonlyArray3, PyReadonlyArray4};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};

impl From<FringesError> for PyErr {
    fn from(e: FringesError) -> Self {
        match e {
            FringesError::Io(e) => PyIOError::new_err(e.to_string()),
            e => PyValueError::new_err(e.to_string()),
        }
    }
}

fn parse_update(json: &str) -> PyResult<Update> {
    serde_json::from_str(json).map_err(|e| PyValueError::new_err(format!("invalid parameters: {e}")))
}

fn to_numpy(py: Python<'_>, frames: FramePattern) -> PyObject {
    match frames {
        FramePattern::U8(a) => a.into_pyarray(py).into_py(py),
        FramePattern::U16(a) => a.into_pyarray(py).into_py(py),
        FramePattern::F32(a) => a.into_pyarray(py).into_py(py),
        FramePattern::F64(a) => a.into_pyarray(py).into_py(py),
        FramePattern::Bool(a) => a.into_pyarray(py).into_py(py),
    }
}

fn try_extract<T: Element + Clone>(frames: &PyAny) -> Option<Array4<T>> {
    frames.extract::<PyReadonlyArray4<T>>().ok().map(|a| a.as_array().to_owned())
}

fn from_numpy(frames: &PyAny) -> PyResult<FramePattern> {
    if let Some(a) = try_extract::<u8>(frames) {
        return Ok(a.into());
    }
    if let Some(a) = try_extract::<u16>(frames) {
        return Ok(a.into());
    }
    if let Some(a) = try_extract::<f32>(frames) {
        return Ok(a.into());
    }
    if let Some(a) = try_extract::<f64>(frames) {
        return Ok(a.into());
    }
    if let Some(a) = try_extract::<bool>(frames) {
        return Ok(a.into());
    }
    Err(PyValueError::new_err("frames must be a 4D array (T, Y, X, C) of uint8, uint16, float32, float64 or bool"))
}

#[pyclass(name = "Fringes")]
pub struct PyFringes {
    inner: Fringes<'static>,
}

#[pymethods]
impl PyFringes {
    /// `params` is an optional JSON object of parameters, e.g. `{"X": 640, "N": 4}`.
    #[new]
    #[pyo3(signature = (params = None))]
    fn new(params: Option<&str>) -> PyResult<Self> {
        let mut inner = Fringes::new();
        if let Some(json) = params {
            inner.update(&parse_update(json)?);
        }
        Ok(Self { inner })
    }

    /// Applies a JSON object of parameters and returns the names of the rejected ones.
    fn update(&mut self, json: &str) -> PyResult<Vec<String>> {
        let rejected = self.inner.update(&parse_update(json)?);
        Ok(rejected.into_iter().map(|r| r.field.to_string()).collect())
    }

    fn params_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.params().to_update()).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    #[getter]
    #[allow(non_snake_case)]
    fn T(&self) -> usize {
        self.inner.t()
    }

    #[getter]
    fn shape(&self) -> (usize, usize, usize, usize) {
        self.inner.params().shape()
    }

    #[getter]
    #[allow(non_snake_case)]
    fn UMR(&self) -> Vec<f64> {
        self.inner.params().umr().to_vec()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    #[pyo3(signature = (frames = None, simulate = None))]
    fn encode(&mut self, py: Python<'_>, frames: Option<Vec<i64>>, simulate: Option<u64>) -> PyResult<PyObject> {
        let opts = EncodeOptions { frames, simulate, ..EncodeOptions::default() };
        let inner = &mut self.inner;
        let out = py.allow_threads(|| inner.encode(&opts))?;
        Ok(to_numpy(py, out))
    }

    /// Decodes a recording into a dict of arrays; the quality measures are added if `verbose`.
    #[pyo3(signature = (frames, verbose = false, despike = false, denoise = false))]
    fn decode(&mut self, py: Python<'_>, frames: &PyAny, verbose: bool, despike: bool, denoise: bool) -> PyResult<PyObject> {
        let frames = from_numpy(frames)?;
        let opts = DecodeOptions { verbose, despike, denoise };
        let inner = &mut self.inner;
        let field = py.allow_threads(|| inner.decode(&frames, opts))?;

        let out = PyDict::new(py);
        out.set_item("brightness", field.brightness.into_pyarray(py))?;
        out.set_item("modulation", field.modulation.into_pyarray(py))?;
        out.set_item("registration", field.registration.into_pyarray(py))?;
        let optional = [
            ("residuals", field.residuals),
            ("phase", field.phase),
            ("orders", field.orders),
            ("uncertainty", field.uncertainty),
            ("visibility", field.visibility),
            ("exposure", field.exposure),
        ];
        for (name, value) in optional {
            if let Some(a) = value {
                out.set_item(name, a.into_pyarray(py))?;
            }
        }
        Ok(out.into_py(py))
    }

    /// Source activation heatmap of a registration, optionally weighted by modulation.
    #[pyo3(signature = (registration, modulation = None, dx = 1.0))]
    fn remap<'py>(
        &mut self,
        py: Python<'py>,
        registration: PyReadonlyArray4<f64>,
        modulation: Option<PyReadonlyArray4<f64>>,
        dx: f64,
    ) -> PyResult<&'py PyArray3<f64>> {
        let reg = registration.as_array().to_owned();
        let weights = modulation.map(|b| b.as_array().to_owned());
        let src = self.inner.source(&reg, weights.as_ref(), dx)?;
        Ok(src.into_pyarray(py))
    }

    #[pyo3(signature = (src, threshold = 0.1, k = 3))]
    fn brightfield(&self, py: Python<'_>, src: PyReadonlyArray3<f64>, threshold: f64, k: usize) -> PyObject {
        to_numpy(py, self.inner.brightfield(&src.as_array().to_owned(), threshold, k))
    }

    #[pyo3(signature = (src, threshold = 0.1, k = 3))]
    fn darkfield(&self, py: Python<'_>, src: PyReadonlyArray3<f64>, threshold: f64, k: usize) -> PyObject {
        to_numpy(py, self.inner.darkfield(&src.as_array().to_owned(), threshold, k))
    }

    fn curvature<'py>(&self, py: Python<'py>, registration: PyReadonlyArray4<f64>) -> PyResult<&'py PyArray3<f64>> {
        let c = self.inner.curvature(&registration.as_array().to_owned())?;
        Ok(c.into_pyarray(py))
    }

    fn save(&self, path: &str) -> PyResult<()> {
        Ok(self.inner.save(path)?)
    }

    fn load(&mut self, path: &str) -> PyResult<()> {
        Ok(self.inner.load(path)?)
    }

    #[pyo3(signature = (t = None, umax = None))]
    fn optimize(&mut self, t: Option<usize>, umax: Option<f64>) -> Vec<String> {
        self.inner.optimize(t, umax).into_iter().map(|r| r.field.to_string()).collect()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// Height map whose Laplacian is the given curvature.
#[pyfunction]
fn height<'py>(py: Python<'py>, curvature: PyReadonlyArray3<f64>) -> &'py PyArray3<f64> {
    integrate(&curvature.as_array().to_owned()).into_pyarray(py)
}

/// Linearizes recorded frames with a gamma estimated from their median.
#[pyfunction]
fn gamma_auto_correct<'py>(py: Python<'py>, frames: &PyAny) -> PyResult<&'py PyArray4<f64>> {
    let frames = from_numpy(frames)?;
    Ok(linearize(&frames).into_pyarray(py))
}

pub fn register(m: &PyModule) -> PyResult<()> {
    m.add_class::<PyFringes>()?;
    m.add_function(wrap_pyfunction!(height, m)?)?;
    m.add_function(wrap_pyfunction!(gamma_auto_correct, m)?)?;
    Ok(())
}
