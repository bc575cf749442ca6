//! Reader for 1-D NumPy structured arrays (`.npy`).

mod dtype;
mod header;

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{Catalogue, Column};
use dtype::{DType, Kind};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Read a structured `.npy` file into a [`Catalogue`], one column per
/// non-padding field.
#[instrument(fields(path = %path.display()))]
pub(crate) fn read(path: &Path) -> Result<Catalogue, IoError> {
    let bytes = std::fs::read(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(path, &bytes)
}

fn parse(path: &Path, bytes: &[u8]) -> Result<Catalogue, IoError> {
    let header_error = |reason: String| IoError::NpyHeader {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(IoError::NpyMagic {
            path: path.to_path_buf(),
        });
    }
    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, prefix_len) = match (major, minor) {
        (1, 0) => (usize::from(u16::from_le_bytes([bytes[8], bytes[9]])), 10),
        (2 | 3, 0) => {
            let Some(len) = bytes.get(8..12) else {
                return Err(header_error("file ends inside the header length".into()));
            };
            let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]);
            (len as usize, 12)
        }
        _ => {
            return Err(IoError::NpyVersion {
                path: path.to_path_buf(),
                major,
                minor,
            });
        }
    };
    let header_end = prefix_len + header_len;
    let Some(header_bytes) = bytes.get(prefix_len..header_end) else {
        return Err(header_error("header runs past the end of the file".into()));
    };
    let text = std::str::from_utf8(header_bytes).map_err(|_| header_error("header is not valid UTF-8".into()))?;
    let header = header::parse(text).map_err(header_error)?;
    debug!(major, n_fields = header.fields.len(), shape = ?header.shape, "parsed header");

    if header.fortran_order {
        return Err(IoError::NpyFortranOrder {
            path: path.to_path_buf(),
        });
    }
    let n_rows = match header.shape.as_slice() {
        [n] => *n,
        _ => {
            return Err(IoError::NpyShape {
                path: path.to_path_buf(),
                shape: header.shape.clone(),
            });
        }
    };

    let mut fields = Vec::with_capacity(header.fields.len());
    let mut offset = 0usize;
    for descr in header.fields {
        let dtype = DType::parse(&descr.dtype).ok_or_else(|| IoError::NpyDtype {
            path: path.to_path_buf(),
            field: descr.name.clone(),
            descr: descr.dtype.clone(),
        })?;
        fields.push((descr.name, dtype, offset));
        offset += dtype.size;
    }
    let record_size = offset;
    if record_size == 0 {
        return Err(header_error("records have zero width".into()));
    }

    let payload = &bytes[header_end..];
    let expected = n_rows.saturating_mul(record_size);
    if payload.len() < expected {
        return Err(IoError::NpyTruncated {
            path: path.to_path_buf(),
            expected,
            got: payload.len(),
        });
    }
    if n_rows == 0 {
        return Err(IoError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    let mut names = Vec::with_capacity(fields.len());
    let mut columns = Vec::with_capacity(fields.len());
    for (name, dtype, field_offset) in fields {
        if dtype.kind == Kind::Void {
            continue;
        }
        let cells = payload[..expected]
            .chunks_exact(record_size)
            .map(|record| &record[field_offset..field_offset + dtype.size]);
        let column = if dtype.is_numeric() {
            Column::Numeric(cells.map(|cell| dtype.decode_number(cell)).collect())
        } else {
            let values = cells
                .enumerate()
                .map(|(row, cell)| {
                    dtype.decode_text(cell).ok_or_else(|| IoError::NpyText {
                        path: path.to_path_buf(),
                        field: name.clone(),
                        row_index: row,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Column::Text(values)
        };
        names.push(name);
        columns.push(column);
    }

    info!(n_rows, n_columns = columns.len(), "structured array loaded");
    Ok(Catalogue::new(path, names, columns))
}
