//! Input and output documents of the command-line application.
//!
//! ```text
//! Input  ::= { "dataset": Matrix | path, "cata": path? }
//! Output ::= { "cata": Matrix | path, "k": int, "mse": number,
//!              "msehist": [[k, mse], ...], "prof": [[tag, ns, info?], ...] }
//! Matrix ::= { "rows": int, "cols": int, "data": number[] }   // column-major
//! ```
//!
//! A path in place of a matrix refers to a file in the binary layout of
//! [`crate::dataset`].

use crate::dataset::{
    catalog_to_json, dataset_from_json, dump_catalog, load_dataset, Catalog, DataSet, MatrixJson,
    MseHistory,
};
use crate::error::Result;
use crate::profiler::Profiler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// A matrix given inline or as the path of a binary dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixOrPath<T> {
    Matrix(MatrixJson<T>),
    Path(PathBuf),
}

/// Input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub dataset: MatrixOrPath<f64>,
    /// When present, the catalog is dumped to this binary file instead of
    /// being inlined in the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cata: Option<PathBuf>,
}

impl Input {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Materialize the dataset, loading it from disk when given as a path.
    pub fn load_dataset(&self) -> Result<DataSet> {
        match &self.dataset {
            MatrixOrPath::Matrix(matrix) => dataset_from_json(matrix.clone()),
            MatrixOrPath::Path(path) => load_dataset(path),
        }
    }

    /// Inline 3 x 5 dataset holding 1..15, catalog dumped to `cata.matx`.
    pub fn example_inline() -> Self {
        Self {
            dataset: MatrixOrPath::Matrix(MatrixJson {
                rows: 3,
                cols: 5,
                data: (1..=15u32).map(f64::from).collect(),
            }),
            cata: Some(PathBuf::from("cata.matx")),
        }
    }

    /// Dataset read from the binary file at `path`, catalog inlined.
    pub fn example_binary<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            dataset: MatrixOrPath::Path(path.into()),
            cata: None,
        }
    }
}

/// Output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub cata: MatrixOrPath<u32>,
    pub k: usize,
    pub mse: f64,
    pub msehist: MseHistory,
    pub prof: Value,
}

impl Output {
    /// Assemble an output document. When `cata_out` is given the catalog is
    /// dumped there and referenced by path.
    pub fn new(
        catalog: &Catalog,
        cata_out: Option<&Path>,
        k: usize,
        mse: f64,
        msehist: MseHistory,
        profiler: &Profiler,
    ) -> Result<Self> {
        let cata = match cata_out {
            Some(path) => {
                dump_catalog(catalog, path)?;
                MatrixOrPath::Path(path.to_path_buf())
            }
            None => MatrixOrPath::Matrix(catalog_to_json(catalog)),
        };

        Ok(Self {
            cata,
            k,
            mse,
            msehist,
            prof: profiler.to_json(),
        })
    }

    pub fn to_writer<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_writer(BufWriter::new(File::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{dump_dataset, load_catalog};
    use crate::error::ClusterError;
    use ndarray::array;

    #[test]
    fn test_parse_inline_input() {
        let text = r#"{
            "dataset": { "rows": 3, "cols": 5, "data": [1,2,3,4,5,6,7,8,9,10,11,12,13,14,15] },
            "cata": "cata.matx"
        }"#;
        let input = Input::from_reader(text.as_bytes()).unwrap();

        assert_eq!(input, Input::example_inline());
        let data = input.load_dataset().unwrap();
        assert_eq!(data.dim(), (3, 5));
        // Column 1 is the second point: (4, 5, 6)
        assert_eq!(data.column(1).to_vec(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_path_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.matx");
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        dump_dataset(&data, &path).unwrap();

        let text = format!(r#"{{ "dataset": {} }}"#, serde_json::to_string(&path).unwrap());
        let input = Input::from_reader(text.as_bytes()).unwrap();

        assert_eq!(input.cata, None);
        assert_eq!(input.load_dataset().unwrap(), data);
    }

    #[test]
    fn test_bad_inline_matrix() {
        let text = r#"{ "dataset": { "rows": 2, "cols": 2, "data": [1, 2, 3] } }"#;
        let input = Input::from_reader(text.as_bytes()).unwrap();
        assert!(matches!(
            input.load_dataset(),
            Err(ClusterError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_output_inline_catalog() {
        let profiler = Profiler::new();
        profiler.mark("done");
        let catalog: Catalog = array![0, 1, 1, 0];

        let output = Output::new(&catalog, None, 2, 0.5, vec![(2, 0.5)], &profiler).unwrap();
        let mut buf = Vec::new();
        output.to_writer(&mut buf).unwrap();

        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["cata"]["rows"], 4);
        assert_eq!(value["cata"]["cols"], 1);
        assert_eq!(value["k"], 2);
        assert_eq!(value["msehist"], serde_json::json!([[2, 0.5]]));
        assert_eq!(value["prof"][0][0], "done");
    }

    #[test]
    fn test_output_binary_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let cata_path = dir.path().join("cata.matx");
        let catalog: Catalog = array![2, 0, 1];

        let output = Output::new(
            &catalog,
            Some(cata_path.as_path()),
            3,
            0.0,
            MseHistory::new(),
            &Profiler::new(),
        )
        .unwrap();

        assert_eq!(output.cata, MatrixOrPath::Path(cata_path.clone()));
        assert_eq!(load_catalog(&cata_path).unwrap(), catalog);

        let out_path = dir.path().join("out.json");
        output.write(&out_path).unwrap();
        let back: Output = serde_json::from_reader(File::open(&out_path).unwrap()).unwrap();
        assert_eq!(back, output);
    }
}
