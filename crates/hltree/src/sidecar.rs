//! Sidecar pairs: a single field stored as `<prefix>.info` + `<prefix>.data`.
//!
//! The info file holds `KEY: VALUE` lines:
//!
//! ```text
//! DATATYPE: DATASET
//! FIELDNAME: /g/d
//! DATASIZE: 8
//! DATAFORMAT: double
//! DIMS: [2,2]
//! ```
//!
//! `#` starts a comment and blank lines are ignored. `DIMS: [0]` denotes a
//! scalar. The data file holds the raw native-order payload.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{byte_len, Error, Result};
use crate::format::FormatSpecifier;
use crate::node::{Node, NodeKind, MAX_RANK};

/// Which kind of node a sidecar describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Attribute,
    Dataset,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Attribute => "ATTRIBUTE",
            FieldKind::Dataset => "DATASET",
        })
    }
}

/// Parsed contents of an info file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarInfo {
    pub kind: FieldKind,
    pub field_name: String,
    /// Bytes per element.
    pub data_size: usize,
    pub format: FormatSpecifier,
    /// Empty for a scalar.
    pub dims: Vec<u64>,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::Sidecar(msg.into())
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

fn parse_dims(value: &str) -> Result<Vec<u64>> {
    let inner = value
        .trim()
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| invalid(format!("dimensions must be bracketed: {value}")))?;
    let dims = inner
        .split(',')
        .map(|d| {
            d.trim()
                .parse::<u64>()
                .map_err(|_| invalid(format!("bad dimension {d:?}")))
        })
        .collect::<Result<Vec<u64>>>()?;
    if dims.len() > MAX_RANK {
        return Err(Error::RankTooLarge(dims.len()));
    }
    if dims == [0] {
        return Ok(Vec::new());
    }
    Ok(dims)
}

impl SidecarInfo {
    /// Parse the text of an info file.
    pub fn parse(text: &str) -> Result<Self> {
        let mut kind = None;
        let mut field_name = None;
        let mut data_size = None;
        let mut format = None;
        let mut dims = None;
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| invalid(format!("expected KEY: VALUE, got {line:?}")))?;
            let value = value.trim();
            match key.trim() {
                "DATATYPE" => {
                    kind = Some(match value {
                        "ATTRIBUTE" => FieldKind::Attribute,
                        "DATASET" => FieldKind::Dataset,
                        other => {
                            return Err(invalid(format!(
                                "DATATYPE must be ATTRIBUTE or DATASET, not {other}"
                            )))
                        }
                    })
                }
                "FIELDNAME" => {
                    if !value.starts_with('/') {
                        return Err(invalid(format!("field name must begin with '/': {value}")));
                    }
                    field_name = Some(value.to_string());
                }
                "DATASIZE" => {
                    let size = value
                        .parse::<usize>()
                        .ok()
                        .filter(|&s| s > 0)
                        .ok_or_else(|| invalid(format!("DATASIZE must be positive: {value}")))?;
                    data_size = Some(size);
                }
                "DATAFORMAT" => format = Some(value.parse::<FormatSpecifier>()?),
                "DIMS" => dims = Some(parse_dims(value)?),
                other => return Err(invalid(format!("unrecognized key {other}"))),
            }
        }
        Ok(SidecarInfo {
            kind: kind.ok_or_else(|| invalid("missing DATATYPE"))?,
            field_name: field_name.ok_or_else(|| invalid("missing FIELDNAME"))?,
            data_size: data_size.ok_or_else(|| invalid("missing DATASIZE"))?,
            format: format.ok_or_else(|| invalid("missing DATAFORMAT"))?,
            dims: dims.ok_or_else(|| invalid("missing DIMS"))?,
        })
    }

    /// Number of payload bytes the data file must hold.
    pub fn expected_data_len(&self) -> Result<usize> {
        byte_len(&self.dims, self.data_size)
    }

    /// Read and check `<prefix>.info` and `<prefix>.data`.
    pub fn read(prefix: &Path) -> Result<(Self, Vec<u8>)> {
        let info = Self::parse(&fs::read_to_string(with_suffix(prefix, ".info"))?)?;
        let expected = info.expected_data_len()?;
        let data = fs::read(with_suffix(prefix, ".data"))?;
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        tracing::debug!(field = %info.field_name, bytes = data.len(), "read sidecar");
        Ok((info, data))
    }

    /// Write `<prefix>.info` and `<prefix>.data`.
    pub fn write(&self, prefix: &Path, data: &[u8]) -> Result<()> {
        fs::write(with_suffix(prefix, ".info"), self.to_string())?;
        fs::write(with_suffix(prefix, ".data"), data)?;
        Ok(())
    }

    /// Describe a fetched or authored attribute or dataset.
    pub fn from_node(node: &Node) -> Result<Self> {
        let kind = match node.kind() {
            NodeKind::Attribute => FieldKind::Attribute,
            NodeKind::Dataset => FieldKind::Dataset,
            actual => {
                return Err(Error::WrongKind {
                    name: node.name().to_string(),
                    actual,
                })
            }
        };
        Ok(SidecarInfo {
            kind,
            field_name: node.name().to_string(),
            data_size: node.element_size(),
            format: node
                .format()
                .ok_or_else(|| Error::MissingType(node.name().to_string()))?,
            dims: node.dims().to_vec(),
        })
    }

    /// Build an authored node holding `data`.
    pub fn to_node(&self, data: &[u8]) -> Result<Node> {
        let kind = match self.kind {
            FieldKind::Attribute => NodeKind::Attribute,
            FieldKind::Dataset => NodeKind::Dataset,
        };
        let mut node = Node::new(kind, &self.field_name);
        let format = self.format.as_str();
        if self.dims.is_empty() {
            node.set_scalar_value(format, self.data_size, data)?;
        } else {
            node.set_array_value(format, self.data_size, &self.dims, data)?;
        }
        Ok(node)
    }
}

impl fmt::Display for SidecarInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DATATYPE: {}", self.kind)?;
        writeln!(f, "FIELDNAME: {}", self.field_name)?;
        writeln!(f, "DATASIZE: {}", self.data_size)?;
        writeln!(f, "DATAFORMAT: {}", self.format)?;
        if self.dims.is_empty() {
            writeln!(f, "DIMS: [0]")
        } else {
            let dims: Vec<String> = self.dims.iter().map(u64::to_string).collect();
            writeln!(f, "DIMS: [{}]", dims.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &str = "\
# written by hand
DATATYPE: DATASET
FIELDNAME: /g/d

DATASIZE: 8
DATAFORMAT: double   # native doubles
DIMS: [2,2]
";

    #[test]
    fn parses_info_files() {
        let info = SidecarInfo::parse(INFO).unwrap();
        assert_eq!(info.kind, FieldKind::Dataset);
        assert_eq!(info.field_name, "/g/d");
        assert_eq!(info.format, FormatSpecifier::Double);
        assert_eq!(info.dims, vec![2, 2]);
        assert_eq!(info.expected_data_len().unwrap(), 32);
    }

    #[test]
    fn scalars_use_dims_zero() {
        let info = SidecarInfo::parse(
            "DATATYPE: ATTRIBUTE\nFIELDNAME: /a\nDATASIZE: 4\nDATAFORMAT: int\nDIMS: [0]\n",
        )
        .unwrap();
        assert!(info.dims.is_empty());
        assert_eq!(info.expected_data_len().unwrap(), 4);
        assert!(info.to_string().ends_with("DIMS: [0]\n"));
    }

    #[test]
    fn rendering_parses_back() {
        let info = SidecarInfo::parse(INFO).unwrap();
        assert_eq!(SidecarInfo::parse(&info.to_string()).unwrap(), info);
    }

    #[test]
    fn rejects_bad_input() {
        let cases = [
            "DATATYPE: GROUP",
            "FIELDNAME: g/d",
            "DATASIZE: 0",
            "DIMS: 2,2",
            "DIMS: [1,1,1,1,1]",
            "COLOR: red",
            "no separator",
        ];
        for case in cases {
            assert!(SidecarInfo::parse(case).is_err(), "{case}");
        }
        assert!(matches!(
            SidecarInfo::parse("DATAFORMAT: quad"),
            Err(Error::UnknownFormat(_))
        ));
        assert!(matches!(
            SidecarInfo::parse("DATATYPE: DATASET"),
            Err(Error::Sidecar(_))
        ));
    }

    #[test]
    fn files_round_trip_through_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("field");
        let mut node = Node::dataset("/d");
        node.set_array(&[3], &[1i32, 2, 3]).unwrap();
        let info = SidecarInfo::from_node(&node).unwrap();
        info.write(&prefix, node.data()).unwrap();

        let (read, data) = SidecarInfo::read(&prefix).unwrap();
        assert_eq!(read, info);
        let rebuilt = read.to_node(&data).unwrap();
        assert_eq!(rebuilt.values::<i32>().unwrap(), vec![1, 2, 3]);
        assert_eq!(rebuilt.kind(), NodeKind::Dataset);
    }

    #[test]
    fn data_length_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("short");
        fs::write(with_suffix(&prefix, ".info"), INFO).unwrap();
        fs::write(with_suffix(&prefix, ".data"), [0u8; 8]).unwrap();
        assert!(matches!(
            SidecarInfo::read(&prefix),
            Err(Error::SizeMismatch { expected: 32, actual: 8 })
        ));
    }

    #[test]
    fn oversized_dims_are_rejected() {
        let text = "DATATYPE: DATASET\nFIELDNAME: /d\nDATASIZE: 8\nDATAFORMAT: double\n\
                    DIMS: [4294967296,4294967296,4294967296]\n";
        let info = SidecarInfo::parse(text).unwrap();
        assert!(matches!(
            info.expected_data_len(),
            Err(Error::TooLarge { element_size: 8, .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("huge");
        fs::write(with_suffix(&prefix, ".info"), text).unwrap();
        fs::write(with_suffix(&prefix, ".data"), [0u8; 8]).unwrap();
        assert!(matches!(
            SidecarInfo::read(&prefix),
            Err(Error::TooLarge { .. })
        ));
    }

    #[test]
    fn groups_have_no_sidecar() {
        assert!(matches!(
            SidecarInfo::from_node(&Node::group("/g")),
            Err(Error::WrongKind { .. })
        ));
    }
}
