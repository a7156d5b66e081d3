//! Reader and writer for the legacy OpenCV `FileStorage` YAML layout.
//!
//! The layout starts with a `%YAML:1.0` directive that is not valid YAML 1.1,
//! stores matrices as `!!opencv-matrix` tagged mappings and has no booleans.

use serde_yaml::{value::TaggedValue, Mapping, Value};

use crate::error::ParamError;

const CV_HEADER: &str = "%YAML:1.0\n---\n";
const MATRIX_TAG: &str = "opencv-matrix";
// serde_yaml renders every custom tag as a local `!` tag
const LOCAL_MATRIX_TAG: &str = ": !opencv-matrix\n";
const CV_MATRIX_TAG: &str = ": !!opencv-matrix\n";

/// Key based read access to a legacy document.
pub(crate) struct CvReader {
    root: Mapping,
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

impl CvReader {
    /// Parse a legacy document.
    pub fn parse(text: &str) -> Result<Self, ParamError> {
        let body = text
            .lines()
            .skip_while(|line| line.trim_start().starts_with('%'))
            .collect::<Vec<_>>()
            .join("\n");

        match serde_yaml::from_str::<Value>(&body)? {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self {
                root: Mapping::new(),
            }),
            _ => Err(ParamError::MalformedDocument(
                "top level must be a mapping".to_string(),
            )),
        }
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key).map(untag)
    }

    fn required(&self, key: &str) -> Result<&Value, ParamError> {
        self.get(key)
            .ok_or_else(|| ParamError::MissingRequiredField(key.to_string()))
    }

    /// Returns true if the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// An optional integer.
    pub fn opt_i64(&self, key: &str) -> Result<Option<i64>, ParamError> {
        self.get(key)
            .map(|v| v.as_i64().ok_or_else(|| invalid(key, "an integer")))
            .transpose()
    }

    /// A required integer.
    pub fn i64(&self, key: &str) -> Result<i64, ParamError> {
        self.required(key)?
            .as_i64()
            .ok_or_else(|| invalid(key, "an integer"))
    }

    /// An optional integer that fits an `i32`.
    pub fn opt_i32(&self, key: &str) -> Result<Option<i32>, ParamError> {
        self.opt_i64(key)?
            .map(|v| i32::try_from(v).map_err(|_| invalid(key, "a 32-bit integer")))
            .transpose()
    }

    /// An optional real number that fits an `f32`.
    pub fn opt_f32(&self, key: &str) -> Result<Option<f32>, ParamError> {
        self.get(key)
            .map(|v| {
                v.as_f64()
                    .and_then(narrow)
                    .ok_or_else(|| invalid(key, "a finite number"))
            })
            .transpose()
    }

    /// An optional flag stored as an integer.
    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, ParamError> {
        Ok(self.opt_i64(key)?.map(|v| v != 0))
    }

    /// An optional string.
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, ParamError> {
        self.get(key)
            .map(|v| v.as_str().ok_or_else(|| invalid(key, "a string")))
            .transpose()
    }

    /// A required string.
    pub fn str(&self, key: &str) -> Result<&str, ParamError> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| invalid(key, "a string"))
    }

    /// A required matrix with a fixed shape, returned row-major.
    pub fn matrix<const N: usize>(
        &self,
        key: &str,
        rows: usize,
        cols: usize,
    ) -> Result<[f32; N], ParamError> {
        let (r, c, data) = self.matrix_data(key)?;
        if r != rows || c != cols {
            return Err(ParamError::MalformedDocument(format!(
                "{key}: expected a {rows}x{cols} matrix, found {r}x{c}"
            )));
        }
        data.try_into().map_err(|_| invalid(key, "matching data length"))
    }

    /// A required row or column vector of any length.
    pub fn vector(&self, key: &str) -> Result<Vec<f32>, ParamError> {
        let (r, c, data) = self.matrix_data(key)?;
        if r != 1 && c != 1 {
            return Err(ParamError::MalformedDocument(format!(
                "{key}: expected a vector, found {r}x{c}"
            )));
        }
        Ok(data)
    }

    /// A required row or column vector of length `N`.
    pub fn fixed_vector<const N: usize>(&self, key: &str) -> Result<[f32; N], ParamError> {
        let data = self.vector(key)?;
        let len = data.len();
        data.try_into().map_err(|_| {
            ParamError::MalformedDocument(format!("{key}: expected {N} values, found {len}"))
        })
    }

    fn matrix_data(&self, key: &str) -> Result<(usize, usize, Vec<f32>), ParamError> {
        let node = self.required(key)?;
        let dim = |name: &str| {
            node.get(name)
                .and_then(Value::as_u64)
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| invalid(key, "an opencv-matrix"))
        };
        let (rows, cols) = (dim("rows")?, dim("cols")?);
        let len = rows.checked_mul(cols).ok_or_else(|| {
            ParamError::MalformedDocument(format!("{key}: {rows}x{cols} matrix is too large"))
        })?;
        let data = node
            .get("data")
            .and_then(Value::as_sequence)
            .ok_or_else(|| invalid(key, "an opencv-matrix"))?
            .iter()
            .map(|v| {
                v.as_f64()
                    .and_then(narrow)
                    .ok_or_else(|| invalid(key, "finite matrix data"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if data.len() != len {
            return Err(ParamError::MalformedDocument(format!(
                "{key}: {rows}x{cols} matrix holds {} values",
                data.len()
            )));
        }
        Ok((rows, cols, data))
    }
}

// f64 to f32, rejecting values that do not stay finite
fn narrow(v: f64) -> Option<f32> {
    let x = v as f32;
    x.is_finite().then_some(x)
}

fn invalid(key: &str, expected: &str) -> ParamError {
    ParamError::MalformedDocument(format!("{key}: expected {expected}"))
}

/// Builds a legacy document.
#[derive(Default)]
pub(crate) struct CvWriter {
    root: Mapping,
}

impl CvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scalar value.
    pub fn scalar(&mut self, key: &str, value: impl Into<Value>) {
        self.root.insert(Value::from(key), value.into());
    }

    /// Insert a flag as an integer.
    pub fn flag(&mut self, key: &str, value: bool) {
        self.scalar(key, i64::from(value));
    }

    /// Insert a row-major matrix.
    pub fn matrix(&mut self, key: &str, rows: usize, cols: usize, data: &[f32]) {
        let mut node = Mapping::new();
        node.insert("rows".into(), (rows as u64).into());
        node.insert("cols".into(), (cols as u64).into());
        node.insert("dt".into(), "f".into());
        node.insert(
            "data".into(),
            Value::Sequence(data.iter().map(|&x| Value::from(x)).collect()),
        );
        self.root.insert(
            Value::from(key),
            Value::Tagged(Box::new(TaggedValue {
                tag: serde_yaml::value::Tag::new(MATRIX_TAG),
                value: Value::Mapping(node),
            })),
        );
    }

    /// Render the document with its directive header.
    pub fn finish(self) -> Result<String, ParamError> {
        let body = serde_yaml::to_string(&Value::Mapping(self.root))?
            .replace(LOCAL_MATRIX_TAG, CV_MATRIX_TAG);
        Ok(format!("{CV_HEADER}{body}"))
    }
}
